//! Core types for the layout engine

use std::fmt;
use std::str::FromStr;

use super::error::LayoutError;
use super::expr::Expr;

/// Identity of an element within one layout tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Raw index of this element, unique within its tree
    pub fn index(self) -> usize {
        self.0
    }

    /// Reference to this element's `left` attribute
    pub fn left(self) -> Expr {
        Expr::reference(self, Attribute::Left)
    }

    /// Reference to this element's `right` attribute
    pub fn right(self) -> Expr {
        Expr::reference(self, Attribute::Right)
    }

    /// Reference to this element's `top` attribute
    pub fn top(self) -> Expr {
        Expr::reference(self, Attribute::Top)
    }

    /// Reference to this element's `bottom` attribute
    pub fn bottom(self) -> Expr {
        Expr::reference(self, Attribute::Bottom)
    }

    /// Reference to this element's `width` attribute
    pub fn width(self) -> Expr {
        Expr::reference(self, Attribute::Width)
    }

    /// Reference to this element's `height` attribute
    pub fn height(self) -> Expr {
        Expr::reference(self, Attribute::Height)
    }

    /// Reference to this element's `center_x` attribute
    pub fn center_x(self) -> Expr {
        Expr::reference(self, Attribute::CenterX)
    }

    /// Reference to this element's `center_y` attribute
    pub fn center_y(self) -> Expr {
        Expr::reference(self, Attribute::CenterY)
    }

    /// Reference to an arbitrary attribute of this element
    pub fn attr(self, attribute: Attribute) -> Expr {
        Expr::reference(self, attribute)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// The eight anchorable attributes of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
    CenterX,
    CenterY,
}

/// Position of an attribute along its axis, controls padding and gap sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Leading,
    Trailing,
    Neutral,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Left,
        Attribute::Right,
        Attribute::Top,
        Attribute::Bottom,
        Attribute::Width,
        Attribute::Height,
        Attribute::CenterX,
        Attribute::CenterY,
    ];

    /// Attributes stored in the actual geometry cache and sent to the host
    pub const PHYSICAL: [Attribute; 6] = [
        Attribute::Left,
        Attribute::Top,
        Attribute::Right,
        Attribute::Bottom,
        Attribute::Width,
        Attribute::Height,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Left => "left",
            Attribute::Right => "right",
            Attribute::Top => "top",
            Attribute::Bottom => "bottom",
            Attribute::Width => "width",
            Attribute::Height => "height",
            Attribute::CenterX => "center_x",
            Attribute::CenterY => "center_y",
        }
    }

    pub fn kind(self) -> AttributeKind {
        match self {
            Attribute::Left | Attribute::Top => AttributeKind::Leading,
            Attribute::Right | Attribute::Bottom => AttributeKind::Trailing,
            Attribute::Width | Attribute::Height | Attribute::CenterX | Attribute::CenterY => {
                AttributeKind::Neutral
            }
        }
    }

    /// Whether the attribute lives on the horizontal axis
    pub fn is_horizontal(self) -> bool {
        matches!(
            self,
            Attribute::Left | Attribute::Right | Attribute::Width | Attribute::CenterX
        )
    }

    pub fn is_physical(self) -> bool {
        !matches!(self, Attribute::CenterX | Attribute::CenterY)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Attribute::Left),
            "right" => Ok(Attribute::Right),
            "top" => Ok(Attribute::Top),
            "bottom" => Ok(Attribute::Bottom),
            "width" => Ok(Attribute::Width),
            "height" => Ok(Attribute::Height),
            "center_x" => Ok(Attribute::CenterX),
            "center_y" => Ok(Attribute::CenterY),
            other => Err(LayoutError::unknown_attribute(other)),
        }
    }
}

/// Spacing attributes set directly on an element rather than anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// Space kept between edge-anchored peers
    Gap,
    /// Inset applied to children anchored against a container edge
    Padding,
}

impl Spacing {
    pub fn as_str(self) -> &'static str {
        match self {
            Spacing::Gap => "gap",
            Spacing::Padding => "padding",
        }
    }
}

impl FromStr for Spacing {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gap" => Ok(Spacing::Gap),
            "padding" => Ok(Spacing::Padding),
            other => Err(LayoutError::unknown_attribute(other)),
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Whether an element can host children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Element,
    Container,
}

/// Cached physical geometry of an element
///
/// `right` and `bottom` are insets measured from the container's right and
/// bottom edges, the way a positioned stack child is described.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Geometry {
    /// Read a physical attribute; centers are not stored and read as `None`
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Left => self.left,
            Attribute::Top => self.top,
            Attribute::Right => self.right,
            Attribute::Bottom => self.bottom,
            Attribute::Width => self.width,
            Attribute::Height => self.height,
            Attribute::CenterX | Attribute::CenterY => None,
        }
    }

    /// Store a physical attribute, returning whether the cached value changed
    pub fn set(&mut self, attribute: Attribute, value: f64) -> bool {
        let slot = match attribute {
            Attribute::Left => &mut self.left,
            Attribute::Top => &mut self.top,
            Attribute::Right => &mut self.right,
            Attribute::Bottom => &mut self.bottom,
            Attribute::Width => &mut self.width,
            Attribute::Height => &mut self.height,
            Attribute::CenterX | Attribute::CenterY => return false,
        };
        if *slot == Some(value) {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Forget a physical attribute, returning whether it held a value
    pub fn clear(&mut self, attribute: Attribute) -> bool {
        let slot = match attribute {
            Attribute::Left => &mut self.left,
            Attribute::Top => &mut self.top,
            Attribute::Right => &mut self.right,
            Attribute::Bottom => &mut self.bottom,
            Attribute::Width => &mut self.width,
            Attribute::Height => &mut self.height,
            Attribute::CenterX | Attribute::CenterY => return false,
        };
        slot.take().is_some()
    }

    /// Physical attributes that currently hold a value, in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        Attribute::PHYSICAL
            .into_iter()
            .filter_map(|attribute| self.get(attribute).map(|value| (attribute, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_round_trip_names() {
        for attribute in Attribute::ALL {
            assert_eq!(attribute.as_str().parse::<Attribute>().unwrap(), attribute);
        }
    }

    #[test]
    fn test_unknown_attribute_fails_fast() {
        let err = "middle".parse::<Attribute>().unwrap_err();
        assert!(matches!(err, LayoutError::UnknownAttribute { .. }));
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn test_attribute_classification() {
        assert_eq!(Attribute::Left.kind(), AttributeKind::Leading);
        assert_eq!(Attribute::Top.kind(), AttributeKind::Leading);
        assert_eq!(Attribute::Right.kind(), AttributeKind::Trailing);
        assert_eq!(Attribute::Bottom.kind(), AttributeKind::Trailing);
        assert_eq!(Attribute::CenterX.kind(), AttributeKind::Neutral);
        assert_eq!(Attribute::Height.kind(), AttributeKind::Neutral);
    }

    #[test]
    fn test_geometry_set_reports_changes() {
        let mut geometry = Geometry::default();
        assert!(geometry.set(Attribute::Left, 10.0));
        assert!(!geometry.set(Attribute::Left, 10.0));
        assert!(geometry.set(Attribute::Left, 12.0));
        assert!(!geometry.set(Attribute::CenterX, 5.0));
        assert_eq!(geometry.get(Attribute::Left), Some(12.0));
        assert!(geometry.clear(Attribute::Left));
        assert!(!geometry.clear(Attribute::Left));
    }

    #[test]
    fn test_geometry_iter_skips_unset() {
        let mut geometry = Geometry::default();
        assert!(geometry.is_empty());
        geometry.set(Attribute::Width, 40.0);
        geometry.set(Attribute::Top, 2.0);
        let set: Vec<_> = geometry.iter().collect();
        assert_eq!(set, vec![(Attribute::Top, 2.0), (Attribute::Width, 40.0)]);
    }

    #[test]
    fn test_spacing_names() {
        assert_eq!("gap".parse::<Spacing>().unwrap(), Spacing::Gap);
        assert_eq!("padding".parse::<Spacing>().unwrap(), Spacing::Padding);
        assert!("margin".parse::<Spacing>().is_err());
    }
}
