fn main() {
    if let Err(err) = booker_cluster_lib::run() {
        log::error!("booker-cluster failed: {err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
