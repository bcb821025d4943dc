mod cli;

use isoforge::{error::Error, BootImage, ImageBuilder, Manifest, Source};

fn main() -> Result<(), Error> {
  pretty_env_logger::init();

  match cli::parse().command {
    cli::Command::Create {
      output,
      inputs,
      label,
      boot,
      boot_load_size,
      no_joliet,
    } => {
      let mut manifest = Manifest::new();

      for input in &inputs {
        if !input.exists() {
          return Err(Error::NotAFile(input.clone()));
        }
        // Directories keep their own name on the image.
        let destination = if input.is_dir() {
          input
            .canonicalize()?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
        } else {
          String::new()
        };
        manifest.capture(&destination, input)?;
      }

      if let Some(label) = label {
        manifest.set_volume_label(label);
      }

      if let Some(boot) = boot {
        if !boot.is_file() {
          return Err(Error::NotAFile(boot));
        }
        let source = Source::try_from(std::fs::File::open(&boot)?)?;
        manifest.set_boot_image(BootImage::new(source).with_load_size(boot_load_size));
      }

      manifest
        .set_joliet(!no_joliet)
        .set_recording_time(recording_time());

      log::info!(
        "Creating {} from {} entries",
        output.display(),
        manifest.entries().len()
      );

      ImageBuilder::new().build_to_path(manifest, &output)?;
    }
  }

  Ok(())
}

/// `SOURCE_DATE_EPOCH` when set, for reproducible images, else the current time.
fn recording_time() -> chrono::DateTime<chrono::Utc> {
  let Ok(value) = std::env::var("SOURCE_DATE_EPOCH") else {
    return chrono::Utc::now();
  };

  match value
    .trim()
    .parse::<i64>()
    .ok()
    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
  {
    Some(time) => time,
    None => {
      log::warn!("Ignoring invalid SOURCE_DATE_EPOCH {:?}", value);
      chrono::Utc::now()
    }
  }
}
