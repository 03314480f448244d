fn main() {
    if let Err(err) = hospital_import::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
