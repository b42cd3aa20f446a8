//! Just enough of the JPEG marker structure to tell how a frame stores its colours.

use std::ops::Range;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP14: u8 = 0xEE;

/// A marker segment, `payload` excludes the marker and the length field
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub marker: u8,
    pub payload: Range<usize>,
}

/// Marker segments up to and including the first scan header.
/// Stops quietly on malformed data, the decoder reports those.
pub(crate) fn segments(bytes: &[u8]) -> Vec<Segment> {
    let mut segments = Vec::new();
    if !bytes.starts_with(&SOI) {
        return segments;
    }

    let mut position = SOI.len();
    while bytes.get(position) == Some(&0xFF) {
        while bytes.get(position) == Some(&0xFF) {
            position += 1;
        }
        let Some(&marker) = bytes.get(position) else {
            break;
        };
        position += 1;

        match marker {
            EOI => break,
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let Some(&[high, low]) = bytes.get(position..position + 2) else {
            break;
        };
        let length = usize::from(u16::from_be_bytes([high, low]));
        let end = position + length;
        if length < 2 || end > bytes.len() {
            break;
        }

        segments.push(Segment {
            marker,
            payload: position + 2..end,
        });
        if marker == SOS {
            break;
        }
        position = end;
    }

    segments
}

fn is_frame_header(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameComponent {
    pub id: u8,
    pub horizontal_sampling: u8,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub components: Vec<FrameComponent>,
    pub jfif: bool,
    pub adobe_transform: Option<u8>,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Self {
        let mut header = Self::default();

        for Segment { marker, payload } in segments(bytes) {
            let payload = &bytes[payload];
            match marker {
                APP0 => header.jfif |= payload.starts_with(b"JFIF\0"),
                APP14 if payload.starts_with(b"Adobe\0") => {
                    header.adobe_transform = payload.get(11).copied();
                }
                marker if is_frame_header(marker) => {
                    header.components = payload
                        .get(6..)
                        .unwrap_or_default()
                        .chunks_exact(3)
                        .take(usize::from(payload.get(5).copied().unwrap_or(0)))
                        .map(|component| FrameComponent {
                            id: component[0],
                            horizontal_sampling: component[1] >> 4,
                        })
                        .collect();
                }
                _ => {}
            }
        }

        header
    }

    /// Whether the three components hold R, G, B rather than Y, Cb, Cr.
    /// Component ids win over the JFIF marker, which wins over an Adobe marker.
    pub fn stores_rgb(&self) -> bool {
        let ids = self
            .components
            .iter()
            .map(|component| component.id)
            .collect::<Vec<_>>();

        match ids.as_slice() {
            [1, 2, 3] => false,
            [b'R', b'G', b'B'] => true,
            [_, _, _] if self.jfif => false,
            [_, _, _] => self.adobe_transform == Some(0),
            _ => false,
        }
    }

    /// Some component has a horizontal sampling factor above 1, as with 4:2:0 chroma
    pub fn is_horizontally_subsampled(&self) -> bool {
        self.components
            .iter()
            .any(|component| component.horizontal_sampling > 1)
    }
}
