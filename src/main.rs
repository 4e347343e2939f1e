fn main() -> std::process::ExitCode {
    shop_dashboard_lib::run()
}
