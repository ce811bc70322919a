//! rbalance - Build the balance sheet, income statement and KPIs of a ledger.

fn main() -> std::process::ExitCode {
    rustbalance::cmd::run::main()
}
