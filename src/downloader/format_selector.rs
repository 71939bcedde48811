// FormatSelector - quality tier to codec mapping and yt-dlp format specs
//
// Handles:
// - Quality tier -> ordered codec chain (HiFi/Lossless: opus > aac > mp3)
// - Strict per-codec yt-dlp format selectors
// - Lowest-bitrate audio pick for preview playback

use super::models::{AudioFormat, Codec, Quality};

/// Codec fallback order preferred for previews
const PREVIEW_CODECS: [&str; 3] = ["opus", "mp4a", "mp3"];

/// Format selector for audio downloads
pub struct FormatSelector;

impl FormatSelector {
    /// Fixed quality table; the first codec is the primary choice
    pub fn codec_chain(quality: Quality) -> &'static [Codec] {
        match quality {
            Quality::HiFi | Quality::Lossless => &[Codec::Opus, Codec::Aac, Codec::Mp3],
            Quality::High | Quality::Medium => &[Codec::Aac],
            Quality::Low | Quality::Minimum => &[Codec::Mp3],
        }
    }

    /// Codecs to attempt for a request, honouring an explicit override
    pub fn plan(quality: Quality, format_override: Option<Codec>) -> Vec<Codec> {
        match format_override {
            Some(codec) => vec![codec],
            None => Self::codec_chain(quality).to_vec(),
        }
    }

    pub fn primary_codec(quality: Quality) -> Codec {
        Self::codec_chain(quality)[0]
    }

    /// yt-dlp `-f` selector that yields a stream for `codec`, or `None`
    /// when the codec cannot be produced without a transcoder
    pub fn format_spec(codec: Codec, transcoder_available: bool) -> Option<&'static str> {
        match (codec, transcoder_available) {
            (Codec::Opus, _) => Some("bestaudio[acodec=opus]"),
            (Codec::Aac, true) => Some("bestaudio[acodec^=mp4a]/bestaudio/best"),
            (Codec::Aac, false) => Some("bestaudio[ext=m4a]/bestaudio[acodec^=mp4a]"),
            (Codec::Mp3 | Codec::Vorbis, true) => Some("bestaudio/best"),
            (Codec::Mp3 | Codec::Vorbis, false) => None,
        }
    }

    /// Pick a low-bitrate audio-only format for preview playback
    pub fn select_preview_format(formats: &[AudioFormat]) -> Option<&AudioFormat> {
        let audio: Vec<&AudioFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();

        for codec in PREVIEW_CODECS {
            let lowest = audio
                .iter()
                .filter(|f| f.acodec.as_deref().map_or(false, |a| a.starts_with(codec)))
                .min_by(|a, b| a.bitrate().total_cmp(&b.bitrate()));
            if let Some(format) = lowest {
                return Some(format);
            }
        }

        audio
            .into_iter()
            .min_by(|a, b| a.bitrate().total_cmp(&b.bitrate()))
    }
}
