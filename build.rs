fn main() {
    // Build-time overrides consumed through `option_env!`.
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASS");
    println!("cargo:rerun-if-env-changed=DOORBELL_CONFIG");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
