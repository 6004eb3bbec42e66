use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::ThumbnailError;

/// A single ffmpeg/ffprobe invocation.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Input-side seek; must precede `input` to be fast.
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    pub fn single_frame(self) -> Self {
        self.arg("-frames:v").arg("1")
    }

    /// JPEG quality scale, 2 is near-lossless.
    pub fn jpeg_quality(self, q: u32) -> Self {
        self.arg("-q:v").arg(q.to_string())
    }

    pub fn quiet(self) -> Self {
        self.args(["-v", "error"])
    }

    /// Run and return stdout.
    pub async fn execute(&self) -> std::result::Result<Vec<u8>, ThumbnailError> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ThumbnailError::Extract(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ThumbnailError::Extract(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Builds the frame-grab and probe commands used for thumbnails.
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Grab one frame at `offset` into a JPEG file.
    pub fn extract_frame<P: AsRef<Path>>(&self, video_path: P, offset: f64, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Thumbnail extraction")
            .quiet()
            .seek(offset)
            .input(video_path)
            .single_frame()
            .jpeg_quality(2)
            .overwrite()
            .output(output_path)
    }

    /// Grab one frame at `offset` as JPEG bytes on stdout.
    pub fn extract_frame_to_pipe<P: AsRef<Path>>(&self, video_path: P, offset: f64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Thumbnail capture")
            .quiet()
            .seek(offset)
            .input(video_path)
            .single_frame()
            .args(["-f", "image2pipe", "-vcodec", "mjpeg"])
            .jpeg_quality(2)
            .arg("-")
    }

    /// Print the container duration in seconds.
    pub fn probe_duration<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .quiet()
            .args(["-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .output(video_path)
    }
}

/// Parse ffprobe's duration line; `N/A` and garbage yield `None`.
pub fn parse_duration(stdout: &[u8]) -> Option<f64> {
    String::from_utf8_lossy(stdout)
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Keep the seek inside the video: short clips use their midpoint.
pub fn clamp_offset(offset: f64, duration: Option<f64>) -> f64 {
    let offset = offset.max(0.0);
    match duration {
        Some(d) if offset >= d => d / 2.0,
        _ => offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_frame_args() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.extract_frame("in.mov", 1.5, "out.jpg");
        assert_eq!(cmd.binary_path, "ffmpeg");
        let ss = cmd.args.iter().position(|a| a == "-ss").unwrap();
        let input = cmd.args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(cmd.args[ss + 1], "1.500");
        assert!(cmd.args.contains(&"-frames:v".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "out.jpg");
    }

    #[test]
    fn test_pipe_writes_to_stdout() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.extract_frame_to_pipe("in.mov", 0.75);
        assert_eq!(cmd.args.last().unwrap(), "-");
        assert!(cmd.args.contains(&"image2pipe".to_string()));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(b"12.480000\n"), Some(12.48));
        assert_eq!(parse_duration(b"N/A\n"), None);
        assert_eq!(parse_duration(b""), None);
        assert_eq!(parse_duration(b"0.000000\n"), None);
    }

    #[test]
    fn test_clamp_offset() {
        assert_eq!(clamp_offset(1.5, Some(10.0)), 1.5);
        assert_eq!(clamp_offset(1.5, Some(1.0)), 0.5);
        assert_eq!(clamp_offset(1.5, Some(1.5)), 0.75);
        assert_eq!(clamp_offset(1.5, None), 1.5);
        assert_eq!(clamp_offset(-2.0, None), 0.0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_extract_error() {
        let cmd = MediaCommand::new("/nonexistent/ffmpeg-binary", "Thumbnail extraction");
        assert!(matches!(cmd.execute().await, Err(ThumbnailError::Extract(_))));
    }
}
