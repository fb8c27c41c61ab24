//! Binary entrypoint for inlay-cli (made by FontLab https://www.fontlab.com/)

fn main() {
    if let Err(err) = inlay_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
