//! Build-time helpers for rendering the controller's manual page.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use time::{OffsetDateTime, format_description::well_known::Iso8601};

const FALLBACK_DATE: &str = "1970-01-01";

/// Derives the manual page date from `SOURCE_DATE_EPOCH`.
///
/// Falls back to the Unix epoch so rebuilds stay reproducible. Problems with
/// the variable are pushed onto `warnings` without the `cargo:warning=`
/// prefix.
pub fn manual_date_from_env(warnings: &mut Vec<String>) -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return FALLBACK_DATE.into();
    };
    manual_date_from_raw(&raw, warnings)
}

fn manual_date_from_raw(raw: &str, warnings: &mut Vec<String>) -> String {
    let Ok(seconds) = raw.trim().parse::<i64>() else {
        warnings.push(format!(
            "Invalid SOURCE_DATE_EPOCH '{raw}'; expected integer seconds since Unix epoch; \
             falling back to {FALLBACK_DATE}"
        ));
        return FALLBACK_DATE.into();
    };
    let formatted = OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .and_then(|value| value.format(&Iso8601::DATE).ok());
    formatted.map_or_else(
        || {
            warnings.push(format!(
                "Invalid SOURCE_DATE_EPOCH '{raw}'; not a valid Unix timestamp; falling back to \
                 {FALLBACK_DATE}"
            ));
            FALLBACK_DATE.into()
        },
        |date| date,
    )
}

/// Computes `target/generated-man/<target>/<profile>` for packaging.
///
/// The workspace `target` directory is located by walking up from `out_dir`;
/// a relative `target` is used when no such ancestor exists.
#[must_use]
pub fn out_dir_for_target_profile(target: &str, profile: &str, out_dir: Option<&Path>) -> PathBuf {
    let base = out_dir
        .and_then(|dir| {
            dir.ancestors()
                .find(|ancestor| ancestor.file_name().and_then(|name| name.to_str()) == Some("target"))
        })
        .map_or_else(|| PathBuf::from("target"), Path::to_path_buf);
    base.join("generated-man").join(target).join(profile)
}

/// Writes a man page into `dir`, replacing any previous copy via rename.
///
/// # Errors
///
/// Returns any I/O error raised while creating the directory or writing and
/// renaming the page.
pub fn write_man_page(data: &[u8], dir: &Path, page_name: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let destination = dir.join(page_name);
    let staging = dir.join(format!("{page_name}.tmp"));
    fs::write(&staging, data)?;
    fs::rename(&staging, &destination)?;
    Ok(destination)
}
