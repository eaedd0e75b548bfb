use image::DynamicImage;

/// EXIF Orientation tag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Normal),
            2 => Some(Self::FlipHorizontal),
            3 => Some(Self::Rotate180),
            4 => Some(Self::FlipVertical),
            5 => Some(Self::Transpose),
            6 => Some(Self::Rotate90),
            7 => Some(Self::Transverse),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }

    /// Read the orientation tag from an encoded image; `Normal` when absent.
    pub fn read(data: &[u8]) -> Self {
        let mut cursor = std::io::Cursor::new(data);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(_) => return Self::Normal,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| Self::from_u16(value as u16))
            .unwrap_or_default()
    }

    /// Whether displaying the stored pixels requires swapping width and height
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    pub fn apply(&self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::FlipHorizontal => img.fliph(),
            Self::Rotate180 => img.rotate180(),
            Self::FlipVertical => img.flipv(),
            Self::Transpose => img.rotate90().fliph(),
            Self::Rotate90 => img.rotate90(),
            Self::Transverse => img.rotate270().fliph(),
            Self::Rotate270 => img.rotate270(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn test_orientation_from_u16() {
        assert_eq!(Orientation::from_u16(1), Some(Orientation::Normal));
        assert_eq!(Orientation::from_u16(6), Some(Orientation::Rotate90));
        assert_eq!(Orientation::from_u16(9), None);
    }

    #[test]
    fn test_read_without_exif_is_normal() {
        assert_eq!(Orientation::read(b"not an image"), Orientation::Normal);
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));

        let rotated = Orientation::Rotate90.apply(img.clone());
        assert_eq!(rotated.dimensions(), (2, 4));
        assert!(Orientation::Rotate90.swaps_axes());

        let rotated = Orientation::Rotate180.apply(img.clone());
        assert_eq!(rotated.dimensions(), (4, 2));
        assert!(!Orientation::Rotate180.swaps_axes());

        let flipped = Orientation::Transverse.apply(img);
        assert_eq!(flipped.dimensions(), (2, 4));
    }
}
