use std::{
    error::Error,
    ffi::OsStr,
    fs::{self, create_dir_all, File},
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use bootimg_parse::{BootImage, UnpackOptions};
use clap::Parser;

/// Split an Android boot image into its parts and check its integrity
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the boot image
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the unpacked files
    #[arg(short, long, default_value = "./")]
    output: PathBuf,

    /// Page size override, in hexadecimal
    #[arg(short, long, value_parser = parse_hex)]
    pagesize: Option<u32>,
}

fn parse_hex(arg: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(arg.trim_start_matches("0x"), 16)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(&args.input)?);
    let options = UnpackOptions {
        page_size: args.pagesize,
        ..UnpackOptions::default()
    };
    let image = BootImage::unpack(&mut reader, &options)?;

    println!("Android magic found at: {}", image.magic_offset);
    let cmdline = String::from_utf8_lossy(image.header.cmdline());
    println!("BOARD_KERNEL_CMDLINE {cmdline}");
    println!("BOARD_KERNEL_BASE {:08x}", image.header.kernel_base());
    println!("BOARD_PAGE_SIZE {}", image.header.page_size);

    write_outputs(args, &image, &cmdline)?;

    println!("Checksum {} {}", image.checksum.hex(), image.checksum.verdict);
    Ok(())
}

/// Writes the per-image side files. Only runs once the whole image has been
/// unpacked, so a failed run leaves no partial files behind.
fn write_outputs(args: &Args, image: &BootImage, cmdline: &str) -> io::Result<()> {
    let stem = args.input.file_name().unwrap_or(OsStr::new("boot.img"));
    create_dir_all(&args.output)?;

    let base = format!("{:08x}", image.header.kernel_base());
    write_text(&out_path(&args.output, stem, "-cmdline"), cmdline)?;
    write_text(&out_path(&args.output, stem, "-base"), &base)?;
    write_text(
        &out_path(&args.output, stem, "-pagesize"),
        &image.header.page_size.to_string(),
    )?;
    fs::write(out_path(&args.output, stem, "-zImage"), &image.segments.kernel)?;
    fs::write(
        out_path(&args.output, stem, "-ramdisk.gz"),
        &image.segments.ramdisk,
    )?;
    Ok(())
}

fn out_path(dir: &Path, stem: &OsStr, suffix: &str) -> PathBuf {
    let mut name = stem.to_os_string();
    name.push(suffix);
    dir.join(name)
}

/// Text side files carry a trailing newline.
fn write_text(path: &Path, contents: &str) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(contents.as_bytes())?;
    f.write_all(b"\n")
}
