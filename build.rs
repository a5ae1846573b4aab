fn main() {
    // ESP-IDF link arguments are only emitted for on-target builds; host
    // builds (simulator, tests) need nothing from the build script.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
