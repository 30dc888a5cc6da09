//! Best-effort play-duration probe for audio payloads.
//!
//! Decodes MPEG audio frame headers: enough to honor a Xing/Info frame
//! count for VBR files and to estimate from the bitrate for CBR files.
//! This is metadata extraction, never an integrity gate; anything the
//! parser cannot make sense of yields no duration.

/// Probe the duration in whole seconds. `None` when the payload is not
/// recognizable MPEG audio.
pub fn probe_duration(data: &[u8], content_type: &str) -> Option<u64> {
    if !is_audio(content_type) {
        return None;
    }
    let start = skip_id3v2(data);
    let audio = data.get(start..)?;
    let (offset, header) = find_first_frame(audio)?;
    let frame_start = &audio[offset..];

    if let Some(frames) = xing_frame_count(frame_start, &header) {
        let seconds =
            (frames as u64 * header.samples_per_frame as u64) / header.sample_rate as u64;
        return Some(seconds);
    }

    // CBR estimate over the remaining payload.
    let payload_bits = ((audio.len() - offset) as u64) * 8;
    let bps = header.bitrate_kbps as u64 * 1000;
    if bps == 0 {
        return None;
    }
    Some(payload_bits / bps)
}

fn is_audio(content_type: &str) -> bool {
    content_type.starts_with("audio/")
}

/// Skip an ID3v2 tag when present. The tag size is a 28-bit synchsafe int.
fn skip_id3v2(data: &[u8]) -> usize {
    if data.len() < 10 || &data[0..3] != b"ID3" {
        return 0;
    }
    let size = ((data[6] as usize & 0x7f) << 21)
        | ((data[7] as usize & 0x7f) << 14)
        | ((data[8] as usize & 0x7f) << 7)
        | (data[9] as usize & 0x7f);
    10 + size
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
}

#[derive(Debug, Clone)]
struct FrameHeader {
    version: Version,
    bitrate_kbps: u32,
    sample_rate: u32,
    samples_per_frame: u32,
    mono: bool,
}

// Layer III bitrates (kbps) by version, index 1..=14.
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L3: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLE_RATES_V2: [u32; 3] = [22050, 24000, 16000];

fn parse_frame_header(bytes: &[u8]) -> Option<FrameHeader> {
    if bytes.len() < 4 || bytes[0] != 0xff || bytes[1] & 0xe0 != 0xe0 {
        return None;
    }
    let version = match (bytes[1] >> 3) & 0x03 {
        0b11 => Version::Mpeg1,
        0b10 | 0b00 => Version::Mpeg2, // MPEG-2 and 2.5 share tables here
        _ => return None,
    };
    // Layer III only; anything else is not podcast audio we can size.
    if (bytes[1] >> 1) & 0x03 != 0b01 {
        return None;
    }
    let bitrate_index = (bytes[2] >> 4) as usize;
    if bitrate_index == 0 || bitrate_index == 15 {
        return None;
    }
    let sample_rate_index = ((bytes[2] >> 2) & 0x03) as usize;
    if sample_rate_index == 3 {
        return None;
    }

    let (bitrate_kbps, sample_rate, samples_per_frame) = match version {
        Version::Mpeg1 => (
            BITRATES_V1_L3[bitrate_index],
            SAMPLE_RATES_V1[sample_rate_index],
            1152,
        ),
        Version::Mpeg2 => (
            BITRATES_V2_L3[bitrate_index],
            SAMPLE_RATES_V2[sample_rate_index],
            576,
        ),
    };
    let mono = (bytes[3] >> 6) & 0x03 == 0b11;

    Some(FrameHeader {
        version,
        bitrate_kbps,
        sample_rate,
        samples_per_frame,
        mono,
    })
}

/// Scan for the first valid frame sync.
fn find_first_frame(data: &[u8]) -> Option<(usize, FrameHeader)> {
    // Bound the scan; a real stream syncs within the first few KB.
    let limit = data.len().min(64 * 1024);
    for offset in 0..limit {
        if let Some(header) = parse_frame_header(&data[offset..]) {
            return Some((offset, header));
        }
    }
    None
}

/// Frame count from a Xing/Info header in the first frame, when present.
fn xing_frame_count(frame: &[u8], header: &FrameHeader) -> Option<u32> {
    // Side-information length decides where the tag sits.
    let side_info = match (header.version, header.mono) {
        (Version::Mpeg1, true) => 17,
        (Version::Mpeg1, false) => 32,
        (Version::Mpeg2, true) => 9,
        (Version::Mpeg2, false) => 17,
    };
    let tag_offset = 4 + side_info;
    let tag = frame.get(tag_offset..tag_offset + 8)?;
    if &tag[0..4] != b"Xing" && &tag[0..4] != b"Info" {
        return None;
    }
    let flags = u32::from_be_bytes([tag[4], tag[5], tag[6], tag[7]]);
    if flags & 0x1 == 0 {
        return None;
    }
    let count = frame.get(tag_offset + 8..tag_offset + 12)?;
    Some(u32::from_be_bytes([count[0], count[1], count[2], count[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbps, 44.1 kHz, stereo.
    const CBR_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0x00];

    fn cbr_payload(total_len: usize) -> Vec<u8> {
        let mut data = vec![0u8; total_len];
        data[..4].copy_from_slice(&CBR_HEADER);
        data
    }

    #[test]
    fn test_cbr_estimate() {
        // 160_000 bytes at 128 kbps = 10 seconds
        let data = cbr_payload(160_000);
        assert_eq!(probe_duration(&data, "audio/mpeg"), Some(10));
    }

    #[test]
    fn test_non_audio_content_type_is_skipped() {
        let data = cbr_payload(160_000);
        assert_eq!(probe_duration(&data, "image/png"), None);
    }

    #[test]
    fn test_garbage_yields_none() {
        assert_eq!(probe_duration(&[0u8; 4096], "audio/mpeg"), None);
        assert_eq!(probe_duration(b"not audio at all", "audio/mpeg"), None);
    }

    #[test]
    fn test_id3v2_tag_is_skipped() {
        // 100-byte ID3v2 body, then a CBR stream
        let mut data = vec![0u8; 110];
        data[0..3].copy_from_slice(b"ID3");
        data[3] = 0x04; // version
        data[9] = 100; // synchsafe size
        data.extend_from_slice(&cbr_payload(160_000));
        assert_eq!(probe_duration(&data, "audio/mpeg"), Some(10));
    }

    #[test]
    fn test_xing_frame_count_wins() {
        // stereo MPEG-1: side info 32 bytes, tag at 4 + 32
        let mut data = cbr_payload(160_000);
        let tag_offset = 36;
        data[tag_offset..tag_offset + 4].copy_from_slice(b"Xing");
        data[tag_offset + 4..tag_offset + 8].copy_from_slice(&1u32.to_be_bytes());
        // 3829 frames * 1152 samples / 44100 Hz = 100 seconds
        data[tag_offset + 8..tag_offset + 12].copy_from_slice(&3829u32.to_be_bytes());
        assert_eq!(probe_duration(&data, "audio/mpeg"), Some(100));
    }

    #[test]
    fn test_parse_frame_header_fields() {
        let header = parse_frame_header(&CBR_HEADER).unwrap();
        assert_eq!(header.version, Version::Mpeg1);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.samples_per_frame, 1152);
        assert!(!header.mono);
    }
}
