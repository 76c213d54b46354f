//! Forwards node credentials from the environment (or a `.env` file) into the
//! firmware as compile-time constants.

const FORWARDED: [&str; 6] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "FIREBASE_API_KEY",
    "FIREBASE_DATABASE_URL",
    "FIREBASE_USER_EMAIL",
    "FIREBASE_USER_PASSWORD",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    // A missing .env is fine; the variables may come from the shell
    let _ = dotenvy::dotenv();

    for name in FORWARDED {
        println!("cargo:rerun-if-env-changed={name}");
        let value = std::env::var(name).unwrap_or_else(|_| {
            println!("cargo:warning={name} is not set; the node will run without it");
            String::new()
        });
        println!("cargo:rustc-env={name}={value}");
    }
}
