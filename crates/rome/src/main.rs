fn main() {
    if let Err(err) = rome::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
