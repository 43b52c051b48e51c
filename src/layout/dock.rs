//! Dock shorthands
//!
//! A dock names a common placement and expands into primitive anchors
//! against one target: the container for the parent docks, a sibling for
//! `above`, `below`, `left_of` and `right_of`.

use std::fmt;
use std::str::FromStr;

use super::error::LayoutError;
use super::expr::Expr;
use super::types::{Attribute, ElementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dock {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
    LeftCenter,
    RightCenter,
    Sides,
    TopBottom,
    Top,
    Left,
    Bottom,
    Right,
    Center,
    All,
    Above,
    Below,
    RightOf,
    LeftOf,
}

impl Dock {
    pub const ALL: [Dock; 20] = [
        Dock::TopLeft,
        Dock::TopRight,
        Dock::BottomLeft,
        Dock::BottomRight,
        Dock::TopCenter,
        Dock::BottomCenter,
        Dock::LeftCenter,
        Dock::RightCenter,
        Dock::Sides,
        Dock::TopBottom,
        Dock::Top,
        Dock::Left,
        Dock::Bottom,
        Dock::Right,
        Dock::Center,
        Dock::All,
        Dock::Above,
        Dock::Below,
        Dock::RightOf,
        Dock::LeftOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dock::TopLeft => "top_left",
            Dock::TopRight => "top_right",
            Dock::BottomLeft => "bottom_left",
            Dock::BottomRight => "bottom_right",
            Dock::TopCenter => "top_center",
            Dock::BottomCenter => "bottom_center",
            Dock::LeftCenter => "left_center",
            Dock::RightCenter => "right_center",
            Dock::Sides => "sides",
            Dock::TopBottom => "top_bottom",
            Dock::Top => "top",
            Dock::Left => "left",
            Dock::Bottom => "bottom",
            Dock::Right => "right",
            Dock::Center => "center",
            Dock::All => "all",
            Dock::Above => "above",
            Dock::Below => "below",
            Dock::RightOf => "right_of",
            Dock::LeftOf => "left_of",
        }
    }

    /// Whether the target of this dock is a sibling rather than the container
    pub fn is_peer(self) -> bool {
        matches!(self, Dock::Above | Dock::Below | Dock::RightOf | Dock::LeftOf)
    }

    /// Attributes this dock declares, in assignment order
    pub fn attributes(self) -> &'static [Attribute] {
        use Attribute::*;
        match self {
            Dock::TopLeft => &[Top, Left],
            Dock::TopRight => &[Top, Right],
            Dock::BottomLeft => &[Bottom, Left],
            Dock::BottomRight => &[Bottom, Right],
            Dock::TopCenter => &[Top, CenterX],
            Dock::BottomCenter => &[Bottom, CenterX],
            Dock::LeftCenter => &[Left, CenterY],
            Dock::RightCenter => &[Right, CenterY],
            Dock::Sides => &[Left, Right],
            Dock::TopBottom => &[Top, Bottom],
            Dock::Top => &[Left, Top, Right],
            Dock::Left => &[Top, Left, Bottom],
            Dock::Bottom => &[Left, Bottom, Right],
            Dock::Right => &[Top, Right, Bottom],
            Dock::Center => &[CenterX, CenterY],
            Dock::All => &[Left, Right, Top, Bottom],
            Dock::Above => &[CenterX, Bottom],
            Dock::Below => &[CenterX, Top],
            Dock::RightOf => &[CenterY, Left],
            Dock::LeftOf => &[CenterY, Right],
        }
    }

    /// Primitive anchors for docking against `target`
    pub fn expand(self, target: ElementId) -> Vec<(Attribute, Expr)> {
        self.attributes()
            .iter()
            .map(|&attribute| (attribute, target.attr(peer_source(self, attribute))))
            .collect()
    }
}

/// Which attribute of the target an anchored attribute reads
fn peer_source(dock: Dock, attribute: Attribute) -> Attribute {
    match (dock, attribute) {
        (Dock::Above, Attribute::Bottom) => Attribute::Top,
        (Dock::Below, Attribute::Top) => Attribute::Bottom,
        (Dock::RightOf, Attribute::Left) => Attribute::Right,
        (Dock::LeftOf, Attribute::Right) => Attribute::Left,
        _ => attribute,
    }
}

impl fmt::Display for Dock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dock_{}", self.as_str())
    }
}

impl FromStr for Dock {
    type Err = LayoutError;

    /// Accepts both `dock_top_left` and `top_left`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("dock_").unwrap_or(s);
        Dock::ALL
            .into_iter()
            .find(|dock| dock.as_str() == name)
            .ok_or_else(|| LayoutError::unknown_dock(s))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_dock_names() {
        assert_eq!("dock_top_left".parse::<Dock>().unwrap(), Dock::TopLeft);
        assert_eq!("below".parse::<Dock>().unwrap(), Dock::Below);
        for dock in Dock::ALL {
            assert_eq!(dock.to_string().parse::<Dock>().unwrap(), dock);
        }
    }

    #[test]
    fn test_unknown_dock() {
        let err = "dock_middle".parse::<Dock>().unwrap_err();
        assert_eq!(err, LayoutError::unknown_dock("dock_middle"));
    }

    #[test]
    fn test_parent_dock_uses_same_edges() {
        let root = ElementId(0);
        assert_eq!(
            Dock::Top.expand(root),
            vec![
                (Attribute::Left, root.left()),
                (Attribute::Top, root.top()),
                (Attribute::Right, root.right()),
            ]
        );
    }

    #[test]
    fn test_peer_docks_use_opposite_edge() {
        let peer = ElementId(4);
        assert_eq!(
            Dock::Below.expand(peer),
            vec![
                (Attribute::CenterX, peer.center_x()),
                (Attribute::Top, peer.bottom()),
            ]
        );
        assert_eq!(
            Dock::LeftOf.expand(peer),
            vec![
                (Attribute::CenterY, peer.center_y()),
                (Attribute::Right, peer.left()),
            ]
        );
        assert!(Dock::Above.is_peer());
        assert!(!Dock::All.is_peer());
    }
}
