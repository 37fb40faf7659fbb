use std::fs;
use std::path::Path;

use crate::models::config::AudioConfiguration;
use crate::models::error::ProxyError;

/// Write the configuration as pretty-printed JSON.
pub fn write_configuration(config: &AudioConfiguration, path: &Path) -> Result<(), ProxyError> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ProxyError::StorageError(format!("failed to serialize configuration: {}", e)))?;
    fs::write(path, json)
        .map_err(|e| ProxyError::StorageError(format!("failed to write configuration: {}", e)))?;
    Ok(())
}

/// Read and validate a configuration written by [`write_configuration`].
/// Missing fields take their default values.
pub fn read_configuration(path: &Path) -> Result<AudioConfiguration, ProxyError> {
    let json = fs::read_to_string(path)
        .map_err(|e| ProxyError::StorageError(format!("failed to read configuration: {}", e)))?;
    let config: AudioConfiguration = serde_json::from_str(&json)
        .map_err(|e| ProxyError::StorageError(format!("failed to parse configuration: {}", e)))?;
    config.validate().map_err(ProxyError::ConfigurationFailed)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::DeviceDescription;
    use std::path::PathBuf;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_proxy_test_{}_{}", std::process::id(), name))
    }

    #[test]
    fn configuration_survives_a_round_trip() {
        let path = temp_file_path("config.json");
        let config = AudioConfiguration {
            buffer_batch: 8,
            source_batch: 16,
            device: DeviceDescription::named("Headphones"),
        };
        write_configuration(&config, &path).unwrap();
        assert_eq!(read_configuration(&path).unwrap(), config);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_file_contents_are_rejected() {
        let path = temp_file_path("invalid.json");
        fs::write(&path, r#"{ "buffer_batch": 0 }"#).unwrap();
        assert!(matches!(
            read_configuration(&path),
            Err(ProxyError::ConfigurationFailed(_))
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(read_configuration(&path), Err(ProxyError::StorageError(_))));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_a_storage_error() {
        let path = temp_file_path("missing.json");
        assert!(matches!(read_configuration(&path), Err(ProxyError::StorageError(_))));
    }
}
