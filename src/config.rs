use std::env;

pub struct Config {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: Option<String>,
    pub folder: String,
    pub host: String,
    pub port: u16,
    pub static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let cloud_name = env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let api_key = env::var("CLOUDINARY_API_KEY").unwrap_or_default();
        let api_secret = env::var("CLOUDINARY_API_SECRET").unwrap_or_default();

        // Missing credentials are logged, not fatal; requests fail downstream.
        for (name, value) in [
            ("CLOUDINARY_CLOUD_NAME", &cloud_name),
            ("CLOUDINARY_API_KEY", &api_key),
            ("CLOUDINARY_API_SECRET", &api_secret),
        ] {
            if value.is_empty() {
                tracing::warn!("{name} is not set");
            }
        }

        Self {
            cloud_name,
            api_key,
            api_secret,
            api_base: env::var("CLOUDINARY_API_BASE").ok(),
            folder: env::var("GALLERY_FOLDER").unwrap_or_else(|_| "image_gallery".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            static_dir: env::var("STATIC_DIR").ok(),
        }
    }
}
