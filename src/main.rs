fn main() {
    statuswatch::cli::run();
}
