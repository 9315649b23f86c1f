use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List available MIDI devices
    #[arg(long)]
    pub device_list: bool,

    /// Substring the MIDI port names must contain (defaults to the product
    /// string)
    #[arg(long)]
    pub bind_to_device: Option<String>,

    /// Serve the JSON command front end on this address instead of the
    /// interactive shell, e.g. 127.0.0.1:7581
    #[arg(long)]
    pub serve: Option<String>,

    /// Skip switching the device into session mode on startup
    #[arg(long)]
    pub no_startup_mode: bool,
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices
        .iter()
        .any(|d| d.to_lowercase().contains(&device_name.to_lowercase()))
    {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}
