//! Loader for the XML form of the SOL25 AST.
//!
//! The front-end parser has already validated the program; this module only
//! converts the document into the typed tree of [`crate::ast`]. It still
//! rejects structural violations (wrong tags, missing attributes, bad
//! `order` values), but every such rejection is an invariant failure of the
//! pipeline, so the driver classifies all of them as internal errors.
//!
//! The document is read with `quick-xml` into a small navigable element
//! tree first; the typed conversion then never touches the event stream.

use std::fmt;

use indexmap::IndexMap;
use quick_xml::{Reader, events::BytesStart};

use crate::ast::{AssignNode, BlockArena, BlockId, BlockNode, ClassNode, Expr, Literal, MethodNode, Program};

/// Structural failure while loading the AST document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError(String);

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed AST document: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

fn xml_err(err: impl fmt::Display) -> ParseError {
    ParseError::new(err.to_string())
}

/// A navigable XML element: tag, attributes, ordered element children.
/// Text nodes carry nothing in the AST format and are dropped.
#[derive(Debug)]
struct Element {
    tag: String,
    attrs: IndexMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_err)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_err)?.into_owned();
            attrs.insert(key, value);
        }
        Ok(Self {
            tag,
            attrs,
            children: Vec::new(),
        })
    }

    fn attr(&self, name: &str) -> Result<&str, ParseError> {
        self.attrs
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ParseError::new(format!("<{}> is missing attribute '{name}'", self.tag)))
    }

    fn single_child(&self) -> Result<&Element, ParseError> {
        match self.children.as_slice() {
            [child] => Ok(child),
            other => Err(ParseError::new(format!(
                "<{}> must have exactly one child element, found {}",
                self.tag,
                other.len()
            ))),
        }
    }

    fn order(&self) -> Result<u32, ParseError> {
        let raw = self.attr("order")?;
        let order: u32 = raw
            .parse()
            .map_err(|_| ParseError::new(format!("<{}> has non-integer order '{raw}'", self.tag)))?;
        if order == 0 {
            return Err(ParseError::new(format!("<{}> has non-positive order", self.tag)));
        }
        Ok(order)
    }
}

/// Reads the document into an element tree rooted at its single top-level
/// element.
fn build_tree(xml: &str) -> Result<Element, ParseError> {
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::new("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            // the AST format carries no meaningful text or processing nodes
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(ParseError::new("unclosed element at end of document"));
    }
    root.ok_or_else(|| ParseError::new("empty document"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::new("more than one root element"));
    }
    *root = Some(element);
    Ok(())
}

/// Converts the XML document into a typed [`Program`].
pub(crate) fn parse_program(xml: &str) -> Result<Program, ParseError> {
    let root = build_tree(xml)?;
    if root.tag != "program" {
        return Err(ParseError::new(format!("root element is <{}>, expected <program>", root.tag)));
    }
    let mut blocks = BlockArena::default();
    let mut classes = Vec::new();
    for child in &root.children {
        if child.tag != "class" {
            return Err(ParseError::new(format!("unexpected <{}> under <program>", child.tag)));
        }
        classes.push(parse_class(child, &mut blocks)?);
    }
    Ok(Program { classes, blocks })
}

fn parse_class(element: &Element, blocks: &mut BlockArena) -> Result<ClassNode, ParseError> {
    let name = element.attr("name")?.to_owned();
    let parent = element.attr("parent")?.to_owned();
    let mut methods = Vec::new();
    for child in &element.children {
        if child.tag != "method" {
            return Err(ParseError::new(format!("unexpected <{}> under <class>", child.tag)));
        }
        let selector = child.attr("selector")?.to_owned();
        let body = child.single_child()?;
        if body.tag != "block" {
            return Err(ParseError::new(format!("method '{selector}' body is <{}>, expected <block>", body.tag)));
        }
        let body = parse_block(body, blocks)?;
        methods.push(MethodNode { selector, body });
    }
    Ok(ClassNode { name, parent, methods })
}

fn parse_block(element: &Element, blocks: &mut BlockArena) -> Result<BlockId, ParseError> {
    let arity: usize = element
        .attr("arity")?
        .parse()
        .map_err(|_| ParseError::new("non-integer block arity"))?;

    let mut parameters = Vec::new();
    let mut assigns = Vec::new();
    for child in &element.children {
        match child.tag.as_str() {
            "parameter" => parameters.push((child.order()?, child.attr("name")?.to_owned())),
            "assign" => assigns.push((child.order()?, parse_assign(child, blocks)?)),
            other => return Err(ParseError::new(format!("unexpected <{other}> under <block>"))),
        }
    }
    let parameters = sorted_by_order(parameters, "parameter")?;
    let assigns = sorted_by_order(assigns, "assign")?;

    if parameters.len() != arity {
        return Err(ParseError::new(format!(
            "block declares arity {arity} but has {} parameters",
            parameters.len()
        )));
    }
    for (index, name) in parameters.iter().enumerate() {
        if parameters[..index].contains(name) {
            return Err(ParseError::new(format!("duplicate parameter '{name}'")));
        }
    }

    Ok(blocks.alloc(BlockNode { parameters, assigns }))
}

fn parse_assign(element: &Element, blocks: &mut BlockArena) -> Result<AssignNode, ParseError> {
    let [var, expr] = element.children.as_slice() else {
        return Err(ParseError::new("<assign> must hold exactly a <var> and an <expr>"));
    };
    if var.tag != "var" || expr.tag != "expr" {
        return Err(ParseError::new("<assign> must hold exactly a <var> and an <expr>"));
    }
    Ok(AssignNode {
        var: var.attr("name")?.to_owned(),
        expr: parse_expr(expr, blocks)?,
    })
}

fn parse_expr(element: &Element, blocks: &mut BlockArena) -> Result<Expr, ParseError> {
    let inner = element.single_child()?;
    match inner.tag.as_str() {
        "literal" => Ok(Expr::Literal(parse_literal(inner)?)),
        "var" => Ok(Expr::Var(inner.attr("name")?.to_owned())),
        "block" => Ok(Expr::Block(parse_block(inner, blocks)?)),
        "send" => parse_send(inner, blocks),
        other => Err(ParseError::new(format!("unexpected <{other}> under <expr>"))),
    }
}

fn parse_literal(element: &Element) -> Result<Literal, ParseError> {
    match element.attr("class")? {
        "Nil" => Ok(Literal::Nil),
        "True" => Ok(Literal::True),
        "False" => Ok(Literal::False),
        "Integer" => {
            let raw = element.attr("value")?;
            let value: i64 = raw
                .parse()
                .map_err(|_| ParseError::new(format!("integer literal out of range: '{raw}'")))?;
            Ok(Literal::Integer(value))
        }
        "String" => Ok(Literal::String(element.attr("value")?.to_owned())),
        "class" => Ok(Literal::Class(element.attr("value")?.to_owned())),
        other => Err(ParseError::new(format!("unknown literal class '{other}'"))),
    }
}

fn parse_send(element: &Element, blocks: &mut BlockArena) -> Result<Expr, ParseError> {
    let selector = element.attr("selector")?.to_owned();
    let mut receiver = None;
    let mut args = Vec::new();
    for child in &element.children {
        match child.tag.as_str() {
            "expr" => {
                if receiver.replace(parse_expr(child, blocks)?).is_some() {
                    return Err(ParseError::new("<send> has more than one receiver <expr>"));
                }
            }
            "arg" => {
                let expr = child.single_child()?;
                if expr.tag != "expr" {
                    return Err(ParseError::new("<arg> must hold exactly one <expr>"));
                }
                args.push((child.order()?, parse_expr(expr, blocks)?));
            }
            other => return Err(ParseError::new(format!("unexpected <{other}> under <send>"))),
        }
    }
    let receiver = receiver.ok_or_else(|| ParseError::new(format!("send '{selector}' has no receiver")))?;
    let args = sorted_by_order(args, "arg")?;
    if args.len() != selector.matches(':').count() {
        return Err(ParseError::new(format!(
            "send '{selector}' carries {} arguments",
            args.len()
        )));
    }
    Ok(Expr::Send {
        selector,
        receiver: Box::new(receiver),
        args,
    })
}

fn sorted_by_order<T>(mut items: Vec<(u32, T)>, what: &str) -> Result<Vec<T>, ParseError> {
    items.sort_by_key(|(order, _)| *order);
    for pair in items.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(ParseError::new(format!("duplicate {what} order {}", pair[0].0)));
        }
    }
    Ok(items.into_iter().map(|(_, item)| item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"
        <program language="SOL25">
          <class name="Main" parent="Object">
            <method selector="run">
              <block arity="0">
                <assign order="1">
                  <var name="x"/>
                  <expr><literal class="String" value="Hello"/></expr>
                </assign>
                <assign order="2">
                  <var name="y"/>
                  <expr>
                    <send selector="print">
                      <expr><var name="x"/></expr>
                    </send>
                  </expr>
                </assign>
              </block>
            </method>
          </class>
        </program>"#;

    #[test]
    fn loads_a_minimal_program() {
        let program = parse_program(HELLO).unwrap();
        assert_eq!(program.classes.len(), 1);
        let main = &program.classes[0];
        assert_eq!(main.name, "Main");
        assert_eq!(main.parent, "Object");
        assert_eq!(main.methods.len(), 1);
        let body = program.blocks.get(main.methods[0].body);
        assert_eq!(body.arity(), 0);
        assert_eq!(body.assigns.len(), 2);
        assert_eq!(body.assigns[0].var, "x");
        assert!(matches!(&body.assigns[1].expr, Expr::Send { selector, .. } if selector == "print"));
    }

    #[test]
    fn assigns_are_sorted_by_order() {
        let xml = r#"
            <program>
              <class name="Main" parent="Object">
                <method selector="run">
                  <block arity="0">
                    <assign order="2">
                      <var name="b"/>
                      <expr><literal class="Integer" value="2"/></expr>
                    </assign>
                    <assign order="1">
                      <var name="a"/>
                      <expr><literal class="Integer" value="1"/></expr>
                    </assign>
                  </block>
                </method>
              </class>
            </program>"#;
        let program = parse_program(xml).unwrap();
        let body = program.blocks.get(program.classes[0].methods[0].body);
        assert_eq!(body.assigns[0].var, "a");
        assert_eq!(body.assigns[1].var, "b");
    }

    #[test]
    fn parameters_follow_order_attribute() {
        let xml = r#"
            <program>
              <class name="Main" parent="Object">
                <method selector="pair:with:">
                  <block arity="2">
                    <parameter name="second" order="2"/>
                    <parameter name="first" order="1"/>
                  </block>
                </method>
              </class>
            </program>"#;
        let program = parse_program(xml).unwrap();
        let body = program.blocks.get(program.classes[0].methods[0].body);
        assert_eq!(body.parameters, vec!["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn xml_entities_in_string_literals_are_decoded() {
        let xml = r#"
            <program>
              <class name="Main" parent="Object">
                <method selector="run">
                  <block arity="0">
                    <assign order="1">
                      <var name="x"/>
                      <expr><literal class="String" value="a &lt; b &amp; c"/></expr>
                    </assign>
                  </block>
                </method>
              </class>
            </program>"#;
        let program = parse_program(xml).unwrap();
        let body = program.blocks.get(program.classes[0].methods[0].body);
        assert!(matches!(&body.assigns[0].expr, Expr::Literal(Literal::String(s)) if s == "a < b & c"));
    }

    #[test]
    fn arity_parameter_disagreement_is_rejected() {
        let xml = r#"
            <program>
              <class name="Main" parent="Object">
                <method selector="run">
                  <block arity="1"/>
                </method>
              </class>
            </program>"#;
        assert!(parse_program(xml).is_err());
    }

    #[test]
    fn duplicate_orders_are_rejected() {
        let xml = r#"
            <program>
              <class name="Main" parent="Object">
                <method selector="run">
                  <block arity="0">
                    <assign order="1">
                      <var name="a"/>
                      <expr><literal class="Integer" value="1"/></expr>
                    </assign>
                    <assign order="1">
                      <var name="b"/>
                      <expr><literal class="Integer" value="2"/></expr>
                    </assign>
                  </block>
                </method>
              </class>
            </program>"#;
        assert!(parse_program(xml).is_err());
    }

    #[test]
    fn stray_tags_are_rejected() {
        assert!(parse_program("<program><surprise/></program>").is_err());
        assert!(parse_program("<not-a-program/>").is_err());
        assert!(parse_program("").is_err());
    }
}
