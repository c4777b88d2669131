fn main() {
    if let Err(err) = archwire::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
