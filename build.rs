fn main() {
    println!("cargo:rerun-if-env-changed=AIRWATCH_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=AIRWATCH_WIFI_PASS");
    println!("cargo:rerun-if-env-changed=AIRWATCH_NTFY_URL");

    // Only the firmware build needs the ESP-IDF environment; host test
    // builds run without the `espidf` feature.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
