use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use flatfs::io::{BlockStorage, FileBlockEmulator, FileBlockEmulatorBuilder, MemoryDisk};
use flatfs::{FileSys, FsError, Volume, NUM_BLOCKS};
use flatfs_net::{Server, SessionError};

#[derive(Parser)]
#[command(about = "Serves a flatfs volume to one client at a time")]
struct Args {
    /// Port to listen on
    port: u16,

    /// Disk image backing the volume, created and formatted when missing.
    /// Without one the volume lives in memory.
    #[arg(short, long)]
    disk: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// More log output, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn open_image(path: &Path) -> Result<Volume<FileBlockEmulator>, FsError> {
    if path.exists() {
        info!("mounting disk image {}", path.display());
        return Volume::mount(FileBlockEmulator::open_disk(path, NUM_BLOCKS)?);
    }
    info!("creating disk image {}", path.display());
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)?;
    let dev = FileBlockEmulatorBuilder::from(file)
        .with_block_count(NUM_BLOCKS)
        .build()?;
    Volume::format(dev)
}

fn serve<T: BlockStorage>(server: &Server, volume: Volume<T>) -> Result<(), SessionError> {
    let mut fs = FileSys::mount(volume);
    loop {
        match server.serve_one(&mut fs) {
            Ok(()) => {}
            // A misbehaving client does not take the volume down with it.
            Err(err) if err.is_client_fault() => warn!("dropped client: {}", err),
            Err(err) => return Err(err),
        }
        fs.store_mut().sync()?;
        info!("{} blocks free", fs.store().free_blocks());
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    tools::init_logger(args.verbose);

    let server = match Server::bind((args.host.as_str(), args.port)) {
        Ok(server) => server,
        Err(err) => {
            error!("cannot listen on port {}: {}", args.port, err);
            return ExitCode::FAILURE;
        }
    };

    let result = match &args.disk {
        Some(path) => open_image(path)
            .map_err(SessionError::from)
            .and_then(|volume| serve(&server, volume)),
        None => Volume::format(MemoryDisk::new(NUM_BLOCKS))
            .map_err(SessionError::from)
            .and_then(|volume| serve(&server, volume)),
    };

    if let Err(err) = result {
        error!("{}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
