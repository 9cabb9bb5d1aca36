use rigor_cli::ExitStatus;

fn main() -> ExitStatus {
    rigor_cli::main()
}
