//! Reading program images.
//!
//! An octal image is text holding one or more octal words separated
//! by white space.  Anything from `#` or `;` to the end of a line is
//! a comment.  A binary image holds 16-bit words, most significant
//! byte first.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

const OCTAL: u32 = 8;

#[derive(Debug, PartialEq, Eq)]
pub enum ImageError {
    BadWord { line: usize, text: String },
    OddLength(usize),
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::BadWord { line, text } => write!(
                f,
                "line {line}: '{text}' is not a 16-bit octal number"
            ),
            ImageError::OddLength(n) => write!(
                f,
                "binary image has {n} bytes, which is not a whole number of words"
            ),
        }
    }
}

impl Error for ImageError {}

pub fn parse_octal_image(text: &str) -> Result<Vec<u16>, ImageError> {
    let mut words = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let content = match line.find(['#', ';']) {
            Some(pos) => &line[..pos],
            None => line,
        };
        for token in content.split_whitespace() {
            match u16::from_str_radix(token, OCTAL) {
                Ok(word) => words.push(word),
                Err(_) => {
                    return Err(ImageError::BadWord {
                        line: n + 1,
                        text: token.to_string(),
                    });
                }
            }
        }
    }
    Ok(words)
}

pub fn parse_binary_image(bytes: &[u8]) -> Result<Vec<u16>, ImageError> {
    if bytes.len() % 2 != 0 {
        return Err(ImageError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Parses an octal number given on the command line.
pub fn parse_octal(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s, OCTAL).map_err(|e| format!("'{s}' is not an octal number: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octal_image_with_comments() {
        let text = "\
# a small program
060200  ; LDA 200
102077
  177777 0
";
        assert_eq!(
            parse_octal_image(text),
            Ok(vec![0o060200, 0o102077, 0o177777, 0])
        );
    }

    #[test]
    fn test_octal_image_rejects_bad_words() {
        assert_eq!(
            parse_octal_image("1\n2 9\n"),
            Err(ImageError::BadWord {
                line: 2,
                text: "9".to_string()
            })
        );
        assert!(parse_octal_image("200000").is_err());
    }

    #[test]
    fn test_binary_image() {
        assert_eq!(
            parse_binary_image(&[0x84, 0x3F, 0x00, 0x01]),
            Ok(vec![0x843F, 1])
        );
        assert_eq!(parse_binary_image(&[1, 2, 3]), Err(ImageError::OddLength(3)));
    }

    #[test]
    fn test_parse_octal_argument() {
        assert_eq!(parse_octal("77"), Ok(0o77));
        assert!(parse_octal("8").is_err());
    }
}
