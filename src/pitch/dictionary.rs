use std::{
    fs::{
        self,
        File,
    },
    io::{
        self,
        BufReader,
        BufWriter,
    },
    path::{
        Path,
        PathBuf,
    },
};

use liblzma::read::XzDecoder;
use tar::Archive;
use tracing::info;
use vibrato::Dictionary;
use zstd::stream::copy_decode;

use crate::{
    core::{
        http::{
            blocking_client,
            download_to_file,
        },
        AnkimorphError,
    },
    persistence::get_app_data_dir,
};

const IPADIC_URL: &str =
    "https://github.com/daac-tools/vibrato/releases/download/v0.5.0/ipadic-mecab-2_7_0.tar.xz";
const IPADIC_FOLDER: &str = "ipadic-mecab-2_7_0";

pub type ProgressCallback = Box<dyn Fn(String) + Send>;

pub fn tokenizer_dict_dir() -> PathBuf {
    get_app_data_dir().join("dictionaries").join("tokenizer")
}

fn cleanup_files(folder_path: &Path, keep_files: &[&str]) -> Result<(), AnkimorphError> {
    let keep_paths: Vec<PathBuf> = keep_files.iter().map(|f| folder_path.join(f)).collect();

    for entry in fs::read_dir(folder_path).map_err(|e| {
        AnkimorphError::Custom(format!("Failed to read directory during cleanup: {}", e))
    })? {
        let entry = entry.map_err(|e| {
            AnkimorphError::Custom(format!("Failed to get directory entry during cleanup: {}", e))
        })?;
        let path = entry.path();

        if keep_paths.contains(&path) {
            continue;
        }

        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| {
                AnkimorphError::Custom(format!(
                    "Failed to remove directory during cleanup: {:?} - {}",
                    path, e
                ))
            })?;
        } else {
            fs::remove_file(&path).map_err(|e| {
                AnkimorphError::Custom(format!(
                    "Failed to remove file during cleanup: {:?} - {}",
                    path, e
                ))
            })?;
        }
    }

    info!("Cleanup complete. Retained files: {:?}", keep_files);
    Ok(())
}

/// Path of the IPADIC `system.dic` under `dict_dir`, downloading and
/// unpacking it on first use.
pub fn ensure_dictionary(
    dict_dir: &Path,
    progress_callback: Option<ProgressCallback>,
) -> Result<PathBuf, AnkimorphError> {
    let extract_path = dict_dir.join(IPADIC_FOLDER);
    let final_dic_path = extract_path.join("system.dic");

    if final_dic_path.exists() {
        callback_message("Tokenizer dictionary already downloaded, loading...", &progress_callback);
        return Ok(final_dic_path);
    }

    fs::create_dir_all(dict_dir).map_err(|e| {
        AnkimorphError::Custom(format!("Failed to create dictionary directory {:?}: {}", dict_dir, e))
    })?;

    // Leftovers of an interrupted setup.
    let download_path = dict_dir.join(format!("{}.tar.xz", IPADIC_FOLDER));
    let tar_path = dict_dir.join(format!("{}.tar", IPADIC_FOLDER));
    fs::remove_file(&download_path).ok();
    fs::remove_file(&tar_path).ok();
    fs::remove_dir_all(&extract_path).ok();

    callback_message("Downloading tokenizer dictionary...", &progress_callback);
    let client = blocking_client()?;
    download_to_file(&client, IPADIC_URL, &download_path)?;

    let metadata = download_path.metadata().map_err(|e| {
        AnkimorphError::Custom(format!(
            "Failed to get metadata for downloaded file {:?}: {}",
            download_path, e
        ))
    })?;
    if metadata.len() == 0 {
        return Err(AnkimorphError::Custom(format!(
            "Downloaded file {:?} is empty. Check your internet connection.",
            download_path
        )));
    }

    callback_message("Extracting tokenizer dictionary...", &progress_callback);
    let tar_xz_file = File::open(&download_path)?;
    let mut tar_file = File::create(&tar_path)?;
    let mut xz_decoder = XzDecoder::new(BufReader::new(tar_xz_file));
    io::copy(&mut xz_decoder, &mut tar_file).map_err(|e| {
        AnkimorphError::Custom(format!(
            "Failed to decompress XZ to TAR: {}. Possible corrupt download.",
            e
        ))
    })?;

    let tar_file = File::open(&tar_path)?;
    let mut archive = Archive::new(BufReader::new(tar_file));
    archive.unpack(&extract_path).map_err(|e| {
        AnkimorphError::Custom(format!("Failed to unpack TAR to {:?}: {}.", extract_path, e))
    })?;

    let zst_path = extract_path.join(IPADIC_FOLDER).join("system.dic.zst");
    if !zst_path.exists() {
        return Err(AnkimorphError::Custom(format!(
            "ZST file not found at {:?} after extraction.",
            zst_path
        )));
    }

    callback_message("Finalizing tokenizer setup...", &progress_callback);
    let zst_file = File::open(&zst_path)?;
    let dic_file = File::create(&final_dic_path)?;
    copy_decode(BufReader::new(zst_file), BufWriter::new(dic_file)).map_err(|e| {
        AnkimorphError::Custom(format!("Failed to decompress ZST to {:?}: {}.", final_dic_path, e))
    })?;

    let inner_path = extract_path.join(IPADIC_FOLDER);
    for license in ["BSD", "NOTICE"] {
        if inner_path.join(license).exists() {
            fs::rename(inner_path.join(license), extract_path.join(license))?;
        }
    }

    cleanup_files(&extract_path, &["system.dic", "BSD", "NOTICE"])?;
    fs::remove_file(&download_path)?;
    fs::remove_file(&tar_path)?;
    callback_message("Tokenizer dictionary ready", &progress_callback);

    Ok(final_dic_path)
}

pub fn load_dictionary(path: &Path) -> Result<Dictionary, AnkimorphError> {
    let reader = BufReader::new(File::open(path)?);
    let dict = Dictionary::read(reader)?;
    Ok(dict)
}

fn callback_message(message: &str, callback: &Option<ProgressCallback>) {
    info!("{}", message);
    if let Some(ref cb) = callback {
        cb(message.to_string());
    }
}
