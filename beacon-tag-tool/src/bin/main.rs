use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use beacon_tag::field::{BleLocalName, BleLocalNameUtf16, BleMac};
use beacon_tag::settings::BeaconFrame;
use beacon_tag::{Block, Setting, Tag, TagImage, Transport};
use beacon_tag_tool::{report, CredentialRecord, Error};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "beacon-tag-tool")]
#[command(about = "Read, program and audit beacon configuration tags", long_about = None)]
struct Cli {
    /// Work on a saved tag image instead of a reader. Changes are written back to the file.
    #[arg(long, global = true)]
    image: Option<PathBuf>,

    /// PC/SC reader to use, the first one found by default
    #[arg(long, global = true)]
    reader: Option<String>,

    /// More log output, repeat for APDU traces
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the connected PC/SC readers
    Readers,
    /// Write an erased tag image
    NewImage {
        output: PathBuf,

        /// UID in hex
        #[arg(long)]
        uid: Option<String>,
    },
    #[command(flatten)]
    Tag(TagCommands),
}

/// Commands that talk to a tag, on a reader or in an image file.
#[derive(Subcommand)]
enum TagCommands {
    /// Print the UID of the tag
    Uid,
    /// Print all 49 blocks
    Dump,
    /// Check the CRC in block 48 against blocks 0-47
    ValidateCrc,
    /// Compute the CRC over blocks 0-47 and store it in block 48
    RecomputeCrc,
    /// Set blocks 0-47 to FFFFFFFF and restamp the CRC
    Erase {
        /// Required, erasing can not be undone
        #[arg(long)]
        confirm: bool,
    },
    /// Print the Asset+ settings
    Settings,
    /// Print the LoRa settings (blocks 8-15)
    LoraSettings,
    /// Print BLE MAC, DevEUI, JoinEUI and join key in every format
    LoraInfo,
    /// Read tag after tag and append their LoRa credentials to a CSV log
    LoraLog {
        /// CSV file, created with a header row if it does not exist
        #[arg(default_value = "lora_info.csv")]
        output: PathBuf,
    },
    /// Print the LoRa and BLE MAC addresses
    Macs,
    /// Print the product the tag is configured for
    BeaconInfo,
    /// Print the advertised identifiers
    Uuid {
        #[arg(long, value_enum)]
        frame: Frame,
    },
    /// Print the BLE local name
    BleName {
        /// Read the name as UTF-16
        #[arg(long)]
        utf16: bool,
    },
    /// Program one setting and restamp the CRC
    Set {
        /// One of dev-eui, join-eui, join-key, ble-name, sleep, ble-adv-interval,
        /// high-temperature, low-temperature, dop
        name: String,
        value: String,
    },
    /// Write 8 hex digits to a block. The CRC is not updated.
    WriteBlock {
        block: u8,
        /// Block content, e.g. 0C1EF700
        data: String,
    },
    /// Save the memory of the tag to an image file
    SaveImage { output: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Frame {
    None,
    Ibeacon,
    Eddystone,
}

impl From<Frame> for BeaconFrame {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::None => BeaconFrame::None,
            Frame::Ibeacon => BeaconFrame::IBeacon,
            Frame::Eddystone => BeaconFrame::Eddystone,
        }
    }
}

fn run<T: Transport>(tag: &mut Tag<T>, command: &TagCommands) -> Result<(), Error> {
    match command {
        TagCommands::Uid => println!("{}", hex::encode_upper(tag.uid()?)),
        TagCommands::Dump => print!("{}", report::dump(&tag.dump()?)?),
        TagCommands::ValidateCrc => {
            tag.validate_crc()?;
            println!("CRC valid");
        }
        TagCommands::RecomputeCrc => {
            let crc = tag.recompute_crc()?;
            println!("CRC 0x{crc:04X} written");
        }
        TagCommands::Erase { confirm } => {
            warn!("this erases the whole configuration of the tag");
            if !confirm {
                return Err(Error::NotConfirmed);
            }
            tag.erase()?;
            println!("Tag erased, CRC valid");
        }
        TagCommands::Settings => {
            print!("{}", report::ditto_settings(&tag.read_ditto_settings()?)?)
        }
        TagCommands::LoraSettings => {
            print!("{}", report::lora_settings(&tag.read_lora_settings()?)?)
        }
        TagCommands::LoraInfo => {
            let ble_mac = tag.get::<BleMac>()?;
            let credentials = tag.read_lora_credentials()?;
            print!("{}", report::lora_credentials(&ble_mac, &credentials)?);
            print!("{}", report::ditto_settings(&tag.read_ditto_settings()?)?);
        }
        TagCommands::LoraLog { output } => lora_log(tag, output)?,
        TagCommands::Macs => print!("{}", report::macs(&tag.read_macs()?)?),
        TagCommands::BeaconInfo => print!("{}", report::beacon_info(&tag.read_beacon_info()?)?),
        TagCommands::Uuid { frame } => {
            print!("{}", report::uuid(&tag.read_uuid((*frame).into())?)?)
        }
        TagCommands::BleName { utf16 } => {
            let name = if *utf16 {
                tag.get::<BleLocalNameUtf16>()?
            } else {
                tag.get::<BleLocalName>()?
            };
            println!("{name}");
        }
        TagCommands::Set { name, value } => {
            let setting = Setting::parse(name, value)?;
            tag.mutate(&setting)?;
            println!("{} written", setting.field_name());
        }
        TagCommands::WriteBlock { block, data } => {
            let data: Block = data.parse()?;
            tag.write_block(*block, data)?;
            warn!("block {block} written, the CRC is stale until recompute-crc");
        }
        TagCommands::SaveImage { output } => {
            let bytes: Vec<u8> = tag
                .dump()?
                .iter()
                .flat_map(|block| *block.as_bytes())
                .collect();
            let image = TagImage::from_bytes(&bytes)?.with_uid(&tag.uid()?);
            beacon_tag_tool::save_image(output, &image)?;
            println!("Saved {}", output.display());
        }
    }
    Ok(())
}

fn lora_log<T: Transport>(tag: &mut Tag<T>, output: &Path) -> Result<(), Error> {
    println!("Results are appended to {}", output.display());
    let mut count = 0;
    let stdin = io::stdin();
    loop {
        print!("\nPress <Enter> to read the next tag, 'x' <Enter> to stop: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 || input.trim().eq_ignore_ascii_case("x") {
            break;
        }

        let credentials = match tag.read_lora_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("failed to read the tag: {e}");
                continue;
            }
        };
        let record = CredentialRecord::now(&credentials);
        println!("  DevEUI:     {}", record.dev_eui);
        println!("  JoinEUI:    {}", record.join_eui);
        println!("  JoinKey:    {}", record.join_key);
        println!("  CRC Status: {}", record.crc_status);

        beacon_tag_tool::append_to_log(output, &record)?;
        count += 1;
        info!("{count} tags logged");
    }
    println!("Done, {count} tags read");
    Ok(())
}

#[cfg(feature = "pcsc")]
fn list_readers() -> Result<(), Error> {
    use beacon_tag::transport::reader;

    for name in reader::list_readers().map_err(|e| Error::Reader(e.to_string()))? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(not(feature = "pcsc"))]
fn list_readers() -> Result<(), Error> {
    Err(Error::Reader("built without PC/SC support".to_string()))
}

#[cfg(feature = "pcsc")]
fn with_reader(reader_name: Option<&str>, command: &TagCommands) -> Result<(), Error> {
    use beacon_tag::transport::reader;

    let card = reader::connect(reader_name).map_err(|e| Error::Reader(e.to_string()))?;
    let mut tag = Tag::new(card);
    let result = run(&mut tag, command);
    reader::disconnect(tag.into_inner()).map_err(|e| Error::Reader(e.to_string()))?;
    result
}

#[cfg(not(feature = "pcsc"))]
fn with_reader(_reader_name: Option<&str>, _command: &TagCommands) -> Result<(), Error> {
    Err(Error::Reader(
        "built without PC/SC support, use --image or enable the pcsc feature".to_string(),
    ))
}

fn with_image(path: &Path, command: &TagCommands) -> Result<(), Error> {
    let image = beacon_tag_tool::load_image(path)?;
    let before = image.to_bytes();

    let mut tag = Tag::new(image);
    run(&mut tag, command)?;

    let image = tag.into_inner();
    if image.to_bytes() != before {
        beacon_tag_tool::save_image(path, &image)?;
        info!("image {} updated", path.display());
    }
    Ok(())
}

fn new_image(output: &Path, uid: Option<&str>) -> Result<(), Error> {
    let mut image = TagImage::erased();
    if let Some(uid) = uid {
        image = image.with_uid(&hex::decode(uid)?);
    }
    beacon_tag_tool::save_image(output, &image)?;
    println!("Generated {}", output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &cli.command {
        Commands::Readers => list_readers()?,
        Commands::NewImage { output, uid } => new_image(output, uid.as_deref())?,
        Commands::Tag(command) => match &cli.image {
            Some(path) => with_image(path, command)?,
            None => with_reader(cli.reader.as_deref(), command)?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn commands_without_a_tag_are_separate() {
        let cli = Cli::try_parse_from(["beacon-tag-tool", "new-image", "tag.bin"]).unwrap();
        assert!(matches!(cli.command, Commands::NewImage { .. }));

        let cli = Cli::try_parse_from(["beacon-tag-tool", "readers"]).unwrap();
        assert!(matches!(cli.command, Commands::Readers));

        let cli =
            Cli::try_parse_from(["beacon-tag-tool", "--image", "tag.bin", "set", "dop", "4"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tag(TagCommands::Set { .. })
        ));
    }
}
