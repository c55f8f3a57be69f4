use crate::frontend::Parser;
use crate::frontend::ParserDispatch;
use crate::frontend::TokenKind;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;

/// Source location of an operation.
///
/// Printed as `loc(...)` after the operation, for example:
///
/// ```mlir
/// %0 = arith.constant 1.0 : f32 loc("model.mlir":3:7)
/// ```
///
/// Rewrites that merge several operations into one use [Location::fused] so
/// that the new operation still points back at all of its sources.
#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    Unknown,
    /// A named location such as `loc("conv1/weights")`.
    Name(String),
    FileLineCol {
        file: String,
        line: usize,
        column: usize,
    },
    Fused(Vec<Location>),
}

impl Location {
    pub fn name(name: &str) -> Location {
        Location::Name(name.to_string())
    }
    pub fn file_line_col(file: &str, line: usize, column: usize) -> Location {
        Location::FileLineCol {
            file: file.to_string(),
            line,
            column,
        }
    }
    /// Combine locations into one.
    ///
    /// Nested fused locations are flattened, unknown locations are dropped and
    /// duplicates are removed (the first occurrence wins). Zero remaining
    /// locations give [Location::Unknown] and one remaining location is
    /// returned as is.
    pub fn fused(locations: Vec<Location>) -> Location {
        let mut flat: Vec<Location> = vec![];
        for location in locations {
            let parts = match location {
                Location::Unknown => continue,
                Location::Fused(parts) => parts,
                other => vec![other],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        match flat.len() {
            0 => Location::Unknown,
            1 => flat.remove(0),
            _ => Location::Fused(flat),
        }
    }
    pub fn is_unknown(&self) -> bool {
        matches!(self, Location::Unknown)
    }
    fn display_inner(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Unknown => write!(f, "unknown"),
            Location::Name(name) => write!(f, "\"{name}\""),
            Location::FileLineCol { file, line, column } => {
                write!(f, "\"{file}\":{line}:{column}")
            }
            Location::Fused(locations) => {
                write!(f, "fused[")?;
                for (i, location) in locations.iter().enumerate() {
                    if 0 < i {
                        write!(f, ", ")?;
                    }
                    location.display_inner(f)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::Unknown
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "loc(")?;
        self.display_inner(f)?;
        write!(f, ")")
    }
}

impl<T: ParserDispatch> Parser<T> {
    fn is_location(&self) -> bool {
        self.check(TokenKind::BareIdentifier) && self.peek().lexeme == "loc"
    }
    fn parse_location_inner(&mut self) -> Result<Location> {
        if self.check(TokenKind::String) {
            let text = self.expect(TokenKind::String)?;
            let text = text.lexeme.trim_matches('"').to_string();
            if !self.check(TokenKind::Colon) {
                return Ok(Location::Name(text));
            }
            self.expect(TokenKind::Colon)?;
            let line = self.expect(TokenKind::Integer)?;
            self.expect(TokenKind::Colon)?;
            let column = self.expect(TokenKind::Integer)?;
            let line = line.lexeme.parse::<usize>()?;
            let column = column.lexeme.parse::<usize>()?;
            return Ok(Location::FileLineCol {
                file: text,
                line,
                column,
            });
        }
        let keyword = self.expect(TokenKind::BareIdentifier)?;
        match keyword.lexeme.as_str() {
            "unknown" => Ok(Location::Unknown),
            "fused" => {
                self.expect(TokenKind::LBracket)?;
                let mut locations = vec![];
                while !self.check(TokenKind::RBracket) {
                    locations.push(self.parse_location_inner()?);
                    if self.check(TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RBracket)?;
                // Stored as written; only rewrites normalize.
                Ok(Location::Fused(locations))
            }
            _ => {
                let msg = self.error(&keyword, "Expected location");
                Err(anyhow::anyhow!(msg))
            }
        }
    }
    /// Parse a location such as `loc("a.mlir":1:2)` or `loc(fused["a", "b"])`.
    pub fn parse_location(&mut self) -> Result<Location> {
        self.parse_keyword("loc")?;
        self.expect(TokenKind::LParen)?;
        let location = self.parse_location_inner()?;
        self.expect(TokenKind::RParen)?;
        Ok(location)
    }
    /// Parse a trailing location if there is one.
    pub fn parse_optional_location(&mut self) -> Result<Location> {
        if self.is_location() {
            self.parse_location()
        } else {
            Ok(Location::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fused() {
        let a = Location::name("a");
        let b = Location::file_line_col("b.mlir", 1, 2);
        assert_eq!(Location::fused(vec![]), Location::Unknown);
        assert_eq!(
            Location::fused(vec![Location::Unknown, Location::Unknown]),
            Location::Unknown
        );
        assert_eq!(Location::fused(vec![a.clone(), Location::Unknown]), a);
        assert_eq!(Location::fused(vec![a.clone(), a.clone()]), a);

        let fused = Location::fused(vec![a.clone(), b.clone()]);
        assert_eq!(fused, Location::Fused(vec![a.clone(), b.clone()]));

        let nested = Location::fused(vec![fused.clone(), a.clone(), Location::name("c")]);
        assert_eq!(
            nested,
            Location::Fused(vec![a.clone(), b.clone(), Location::name("c")])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::Unknown.to_string(), "loc(unknown)");
        assert_eq!(Location::name("w").to_string(), "loc(\"w\")");
        let fused = Location::fused(vec![
            Location::name("w"),
            Location::file_line_col("m.mlir", 3, 7),
        ]);
        assert_eq!(fused.to_string(), "loc(fused[\"w\", \"m.mlir\":3:7])");
    }
}
