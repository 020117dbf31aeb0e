use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

pub fn get_tqdm_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(
            "{percent:>3}% |{wide_bar}| {pos}/{len} trials [{elapsed_precise}<{eta_precise}, {custom_per_trial}] {msg}",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
        .with_key(
            "custom_per_trial",
            Box::new(|s: &indicatif::ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1} s/trial", 1.0 / s.per_sec().max(1e-9));
            }),
        ).progress_chars("██ ")
}

/// Whether python3 can import matplotlib, i.e. charts can be rendered
pub fn plotting_available() -> bool {
    Command::new("python3")
        .arg("-c")
        .arg("import matplotlib")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Path relative to the working directory when possible, for printing
pub fn display_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use crate::display_path;
    use std::path::PathBuf;

    #[test]
    fn test_display_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            display_path(cwd.join("plots").join("exp1_set_bits.png")),
            PathBuf::from("plots/exp1_set_bits.png")
        );
        assert_eq!(
            display_path("experiment_results.csv"),
            PathBuf::from("experiment_results.csv")
        );
    }
}
