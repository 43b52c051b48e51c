//! Name binding: turns parsed expressions into layout expressions

use indexmap::IndexMap;

use crate::layout::{find_similar, ElementId, Expr, LayoutError, Predicate};
use crate::parser::ast::*;

/// Element names visible to an expression
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: IndexMap<String, ElementId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, element: ElementId) {
        self.names.insert(name.into(), element);
    }

    pub fn get(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }

    /// Look up a name, suggesting close matches when it is undefined
    pub fn resolve(&self, name: &str) -> Result<ElementId, LayoutError> {
        self.get(name).ok_or_else(|| {
            let suggestions = find_similar(self.names.keys().map(String::as_str), name, 2);
            LayoutError::undefined(name, suggestions)
        })
    }

    fn lookup(&self, identifier: &Identifier) -> Result<ElementId, LayoutError> {
        self.resolve(identifier.as_str())
    }
}

impl FromIterator<(String, ElementId)> for Scope {
    fn from_iter<T: IntoIterator<Item = (String, ElementId)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Resolve every name in `node` against `scope`
pub fn bind_expression(node: &Spanned<ExprNode>, scope: &Scope) -> Result<Expr, LayoutError> {
    Ok(match &node.node {
        ExprNode::Reference { element, attribute } => {
            scope.lookup(&element.node)?.attr(*attribute)
        }
        ExprNode::Number(value) => Expr::Constant(*value),
        ExprNode::Binary { op, left, right } => Expr::binary(
            *op,
            bind_expression(left, scope)?,
            bind_expression(right, scope)?,
        ),
        ExprNode::Negate(inner) => -bind_expression(inner, scope)?,
        ExprNode::Aggregate { kind, items } => {
            let items = items
                .iter()
                .map(|item| bind_expression(item, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Expr::Aggregate { kind: *kind, items }
        }
        ExprNode::Share {
            inner,
            fraction,
            total,
        } => bind_expression(inner, scope)?.share(*fraction, *total),
        ExprNode::Conditional {
            guards,
            value,
            fallback,
        } => {
            let guard = bind_guard(guards, scope)?;
            let expr = Expr::guarded(guard, bind_expression(value, scope)?);
            match fallback {
                Some(fallback) => expr.or(bind_expression(fallback, scope)?),
                None => expr,
            }
        }
        ExprNode::Fallback { value, fallback } => {
            bind_expression(value, scope)?.or(bind_expression(fallback, scope)?)
        }
    })
}

/// Resolve every name in a guard
pub fn bind_guard(
    guards: &[Spanned<PredicateNode>],
    scope: &Scope,
) -> Result<Vec<Predicate>, LayoutError> {
    guards
        .iter()
        .map(|guard| {
            Ok(Predicate::new(
                bind_expression(&guard.node.left, scope)?,
                guard.node.comparison,
                bind_expression(&guard.node.right, scope)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::{parse_expression, parse_guard};

    fn scope() -> Scope {
        [
            ("root".to_string(), ElementId(0)),
            ("menu".to_string(), ElementId(1)),
            ("content".to_string(), ElementId(2)),
        ]
        .into_iter()
        .collect()
    }

    fn bind(source: &str) -> Result<Expr, LayoutError> {
        let node = parse_expression(source).expect("Should parse");
        bind_expression(&node, &scope())
    }

    #[test]
    fn test_bind_arithmetic() {
        let expr = bind("root.width / 2 - 10").unwrap();
        assert_eq!(expr, ElementId(0).width() / 2.0 - 10.0);
    }

    #[test]
    fn test_bind_conditional_with_else() {
        let expr = bind("when root.width >= 600 then menu.right else root.left").unwrap();
        let expected = ElementId(0)
            .width()
            .ge(600.0)
            .then(ElementId(1).right())
            .or(ElementId(0).left());
        assert_eq!(expr, expected);
        assert_eq!(expr.to_string(), expected.to_string());
    }

    #[test]
    fn test_bind_aggregate_and_share() {
        let expr = bind("max(menu.right, content.left)").unwrap();
        assert_eq!(
            expr,
            Expr::max_of([ElementId(1).right(), ElementId(2).left()])
        );
        let share = bind("share(root.width, 2, 3)").unwrap();
        assert_eq!(share, ElementId(0).width().share(2.0, 3.0));
    }

    #[test]
    fn test_undefined_name_suggests_close_matches() {
        let err = bind("mneu.right").unwrap_err();
        match &err {
            LayoutError::UndefinedIdentifier { name, suggestions } => {
                assert_eq!(name, "mneu");
                assert_eq!(suggestions, &vec!["menu".to_string()]);
            }
            other => panic!("Expected UndefinedIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_guard() {
        let guards = parse_guard("root.width < 600 and root.height > 100").unwrap();
        let predicates = bind_guard(&guards, &scope()).unwrap();
        assert_eq!(
            predicates,
            vec![ElementId(0).width().lt(600.0), ElementId(0).height().gt(100.0)]
        );
    }
}
