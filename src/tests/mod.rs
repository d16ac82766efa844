mod loadflow;
mod network;
mod security;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
