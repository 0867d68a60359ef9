fn main() {
    std::process::exit(xpack_cli::cli::main_entry(true));
}
