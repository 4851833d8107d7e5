use racesync_core::services::SyncService;

pub fn run_device_id(service: &SyncService) -> String {
    let device = service.device().to_string();
    println!("{device}");
    device
}
