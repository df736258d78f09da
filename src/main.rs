fn main() {
    afrelay_monitor_lib::run()
}
