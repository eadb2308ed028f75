fn main() {
    xhr_session::cli::run();
}
