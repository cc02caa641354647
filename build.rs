use std::fs;
use std::path::Path;

/// Factory defaults baked into the firmware, read from `secrets.h`
const SECRETS: [&str; 6] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "API_URL",
    "AUTH_TOKEN",
    "IN_SENSOR_ID",
    "OUT_SENSOR_ID",
];

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    embuild::espidf::sysenv::output();

    let secrets_path = "secrets.h";
    println!("cargo:rerun-if-changed={}", secrets_path);

    let contents = if Path::new(secrets_path).exists() {
        fs::read_to_string(secrets_path)?
    } else {
        println!("cargo:warning=secrets.h not found! Copy secrets.h.example to secrets.h and fill in your defaults.");
        String::new()
    };

    for name in SECRETS {
        let define = format!("#define {} ", name);
        let value = contents
            .lines()
            .find(|l| l.trim_start().starts_with(&define))
            .and_then(|l| l.split('"').nth(1))
            .unwrap_or("");
        println!("cargo:rustc-env={}={}", name, value);
    }

    Ok(())
}
