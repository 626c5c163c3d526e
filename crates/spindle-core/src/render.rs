//! The render pass: walking a parsed passage tree, evaluating its
//! expressions, and writing the result into the document through the
//! cursor.

use std::rc::Rc;

use crate::context::Context;
use crate::document::{compile_selector, Cursor, Document, Place};
use crate::error::EngineError;
use crate::expr::eval;
use crate::passage::{parse_passage, AppliedHook, HookBody, Link, Node};
use crate::value::{Changer, ChangerStep, Command, Data};

/// Parse and render passage source at the document cursor.
pub fn render_source(source: &str, doc: &mut Document, ctx: &mut Context) -> Result<(), EngineError> {
    let nodes = parse_passage(source)?;
    render_nodes(&nodes, doc, ctx, false)
}

fn render_nodes(
    nodes: &[Node],
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    for node in nodes {
        match node {
            Node::Text(text) => write_text(doc, text, collapse),
            Node::Newline => write_text(doc, "\n", collapse),
            Node::Collapsed(inner) => render_nodes(inner, doc, ctx, true)?,
            Node::Inline(expr) => {
                let value = eval(expr, ctx)?;
                if matches!(value, Data::Changer(_)) {
                    return Err(EngineError::eval(
                        "this changer needs to be attached to a hook",
                    ));
                }
                print_value(&value, doc, collapse);
            }
            Node::Link(link) => render_link(link, doc),
            Node::Hook(hook) => render_applied(hook, doc, ctx, collapse)?,
        }
    }
    Ok(())
}

fn write_text(doc: &mut Document, text: &str, collapse: bool) {
    if !collapse {
        doc.write_text(text);
        return;
    }
    let mut squeezed = collapse_whitespace(text);
    // A run can span node boundaries; the preceding write already
    // contributed this run's single space.
    if squeezed.starts_with(' ') && doc.char_before_cursor().is_some_and(char::is_whitespace) {
        squeezed.remove(0);
    }
    doc.write_text(&squeezed);
}

/// Inside `{...}` every whitespace run becomes a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

fn print_value(value: &Data, doc: &mut Document, collapse: bool) {
    if !matches!(value, Data::NoValue) {
        write_text(doc, &value.to_string(), collapse);
    }
}

/// A passage link: clicking clears the document and renders the target.
fn render_link(link: &Link, doc: &mut Document) {
    let node = doc.open_container("link");
    doc.write_text(&link.text);
    doc.move_past(node);

    let target = link.target.clone();
    doc.register_click(
        node,
        Rc::new(move |doc, ctx| {
            let source = ctx
                .story()
                .passage_source(&target)
                .ok_or_else(|| EngineError::NoSuchPassage(target.clone()))?
                .to_string();
            doc.clear();
            ctx.enter_passage(&target);
            render_source(&source, doc, ctx)
        }),
    );
}

/// Render one applied hook: evaluate the changer chain, thread the hidden
/// flag and name through it, then either park the body in the hidden-hook
/// registry or render it under the composed steps.
fn render_applied(
    hook: &AppliedHook,
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    if hook.body == HookBody::None {
        return render_payload(hook, doc, ctx, collapse);
    }

    // Inline pseudo-changers apply first, then the chain in source order.
    let mut combined = Changer::default();
    if let Some(inline) = &hook.name {
        combined.steps.push(ChangerStep::Name(inline.name.clone()));
        if inline.hidden {
            combined.steps.push(ChangerStep::Hidden);
        }
    }
    for expr in &hook.changers {
        match eval(expr, ctx)? {
            Data::Changer(changer) => combined = combined.compose(changer),
            other => {
                return Err(EngineError::eval(format!(
                    "expected a changer before this hook, got a {}",
                    other.type_name()
                )))
            }
        }
    }

    let mut hidden = None;
    let mut name = None;
    combined.apply(&mut hidden, &mut name)?;

    let steps: Vec<ChangerStep> = combined
        .steps
        .iter()
        .filter(|step| {
            !matches!(
                step,
                ChangerStep::Hidden | ChangerStep::Show(_) | ChangerStep::Name(_)
            )
        })
        .cloned()
        .collect();

    if hidden == Some(true) {
        // Placeholder now, body later: the registry holds the re-render.
        let node = doc.open_container("hidden");
        if let Some(n) = &name {
            doc.set_hook_name(node, n);
        }
        doc.move_past(node);
        let body = hook.body.clone();
        ctx.register_hidden(
            node,
            Rc::new(move |doc, ctx| render_steps(&steps, &body, doc, ctx, collapse)),
        );
        return Ok(());
    }

    let node = doc.open_container("hook");
    if let Some(n) = &name {
        doc.set_hook_name(node, n);
    }
    let result = render_steps(&steps, &hook.body, doc, ctx, collapse);
    doc.move_past(node);
    result
}

/// A bodiless chain: exactly one expression, whose value is printed, run,
/// or discarded.
fn render_payload(
    hook: &AppliedHook,
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    if hook.name.is_some() {
        return Err(EngineError::eval("a named hook needs a body"));
    }
    let [expr] = hook.changers.as_slice() else {
        return Err(EngineError::eval(
            "a changer chain must be attached to a hook",
        ));
    };
    match eval(expr, ctx)? {
        Data::NoValue => Ok(()),
        Data::Command(command) => run_command(&command, doc, ctx, collapse),
        Data::Changer(_) => Err(EngineError::eval(
            "this changer needs to be attached to a hook",
        )),
        other => {
            print_value(&other, doc, collapse);
            Ok(())
        }
    }
}

/// Apply changer steps around a hook body, outermost first. Each step
/// performs its own cursor mutation around the continued rendering.
fn render_steps(
    steps: &[ChangerStep],
    body: &HookBody,
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    let Some((step, rest)) = steps.split_first() else {
        return render_body(body, doc, ctx, collapse);
    };
    match step {
        ChangerStep::Style(style) => wrapped(doc, style, |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        ChangerStep::TextColor(color) => wrapped(doc, &format!("color:{color}"), |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        ChangerStep::Background(color) => wrapped(doc, &format!("bg:{color}"), |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        ChangerStep::Align(side) => wrapped(doc, &format!("align:{side}"), |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        ChangerStep::Font(font) => wrapped(doc, &format!("font:{font}"), |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        ChangerStep::Css(css) => wrapped(doc, &format!("css:{css}"), |doc| {
            render_steps(rest, body, doc, ctx, collapse)
        }),
        // Visibility and naming were consumed by the applied-hook pass.
        ChangerStep::Hidden | ChangerStep::Show(_) | ChangerStep::Name(_) => {
            render_steps(rest, body, doc, ctx, collapse)
        }
        ChangerStep::Link { text } => {
            let node = doc.open_container("link");
            doc.write_text(text);
            doc.move_past(node);
            let rest = rest.to_vec();
            let body = body.clone();
            doc.register_click(
                node,
                Rc::new(move |doc, ctx| {
                    doc.clear_children(node);
                    doc.retag(node, "hook");
                    doc.set_cursor(Cursor {
                        node,
                        place: Place::Child(0),
                    });
                    render_steps(&rest, &body, doc, ctx, collapse)
                }),
            );
            Ok(())
        }
        ChangerStep::Repeat { var, items } => {
            for item in items {
                ctx.push_scope();
                ctx.bind_local(var, item.clone());
                let result = render_steps(rest, body, doc, ctx, collapse);
                ctx.pop_scope();
                result?;
            }
            Ok(())
        }
        ChangerStep::Revise { selector, advance } => {
            let saved = doc.cursor();
            let mut sel = compile_selector(selector, *advance);
            doc.move_to_start();
            let result = (|| {
                loop {
                    if sel.match_here(doc) {
                        render_steps(rest, body, doc, ctx, collapse)?;
                        sel.resume(doc);
                        continue;
                    }
                    if !doc.advance() {
                        break;
                    }
                }
                Ok(())
            })();
            // The cursor comes back even when the body failed.
            doc.set_cursor(saved);
            result
        }
    }
}

fn wrapped(
    doc: &mut Document,
    tag: &str,
    inner: impl FnOnce(&mut Document) -> Result<(), EngineError>,
) -> Result<(), EngineError> {
    let node = doc.open_container(tag);
    let result = inner(doc);
    doc.move_past(node);
    result
}

fn render_body(
    body: &HookBody,
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    match body {
        HookBody::None => Ok(()),
        HookBody::Hook(nodes) | HookBody::Open(nodes) => render_nodes(nodes, doc, ctx, collapse),
        HookBody::Link(link) => {
            render_link(link, doc);
            Ok(())
        }
    }
}

fn run_command(
    command: &Command,
    doc: &mut Document,
    ctx: &mut Context,
    collapse: bool,
) -> Result<(), EngineError> {
    match command {
        Command::Print(value) => {
            print_value(value, doc, collapse);
            Ok(())
        }
        Command::Display(name) => {
            let source = ctx
                .story()
                .passage_source(name)
                .ok_or_else(|| EngineError::NoSuchPassage(name.clone()))?
                .to_string();
            // Displayed passages render inline and do not touch history.
            let nodes = parse_passage(&source)?;
            render_nodes(&nodes, doc, ctx, collapse)
        }
        Command::Show(spec) => {
            for name in spec.hook_names() {
                let name = name.to_string();
                for node in doc.find_named(&name) {
                    if doc.tag(node) != Some("hidden") {
                        continue;
                    }
                    let Some(rerender) = ctx.take_hidden(node) else {
                        continue;
                    };
                    let saved = doc.cursor();
                    doc.retag(node, "hook");
                    doc.set_cursor(Cursor {
                        node,
                        place: Place::Child(0),
                    });
                    let result = rerender(doc, ctx);
                    doc.set_cursor(saved);
                    result?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::InMemoryStory;

    fn render(source: &str) -> String {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single(source)));
        ctx.enter_passage("Start");
        render_source(source, &mut doc, &mut ctx).unwrap();
        doc.plain_text()
    }

    #[test]
    fn print_renders_canonical_strings() {
        assert_eq!(render("(print: 54)"), "54");
        assert_eq!(render("(print: \"Red\" + \"belly\")"), "Redbelly");
        assert_eq!(render("(print: (a: 2, 3, 4))"), "[2, 3, 4]");
    }

    #[test]
    fn set_then_read_back() {
        assert_eq!(render("(set: $x to 1)(set: $x to it + 1)$x"), "2");
    }

    #[test]
    fn if_chain_renders_one_branch() {
        assert_eq!(
            render("(if: false)[a](else-if: true)[b](else:)[c]"),
            "b"
        );
        assert_eq!(
            render("(if: false)[a](else-if: false)[b](else:)[c]"),
            "c"
        );
        assert_eq!(render("(if: true)[a](else:)[b]"), "a");
    }

    #[test]
    fn for_loop_binds_its_variable() {
        assert_eq!(
            render("(for: each _n, 1, 2, 3)[(print: _n) ]"),
            "1 2 3 "
        );
    }

    #[test]
    fn for_loop_where_filters() {
        assert_eq!(
            render("(for: each _n where _n > 1, 1, 2, 3)[(print: _n)]"),
            "23"
        );
    }

    #[test]
    fn collapsed_span_squeezes_whitespace() {
        assert_eq!(render("{a\n   b}"), "a b");
        assert_eq!(render("a\nb"), "a\nb");
    }

    #[test]
    fn collapse_joins_runs_across_nodes() {
        // The newline and the indent are separate parse nodes but one run.
        assert_eq!(render("{a  \n  b\n\nc}"), "a b c");
        assert_eq!(render("{[x]   y}"), "x y");
        assert_eq!(render("{a (print: \"b\")}"), "a b");
    }

    #[test]
    fn replace_rewrites_a_named_hook() {
        assert_eq!(render("|a>[hi] there(replace: ?a)[bye]"), "bye there");
    }

    #[test]
    fn append_and_prepend() {
        assert_eq!(render("|a>[mid](append: ?a)[-end]"), "mid-end");
        assert_eq!(render("|a>[mid](prepend: ?a)[start-]"), "start-mid");
    }

    #[test]
    fn replace_by_content() {
        assert_eq!(render("the cat sat(replace: \"cat\")[dog]"), "the dog sat");
    }

    #[test]
    fn replace_body_containing_the_needle_runs_once_per_match() {
        assert_eq!(
            render("cat(replace: \"cat\")[(text-style: \"bold\")[cat]]"),
            "cat"
        );
        assert_eq!(
            render("cat and cat(replace: \"cat\")[(text-style: \"bold\")[dog]]"),
            "dog and dog"
        );
    }

    #[test]
    fn stored_changer_applies_to_a_hook() {
        assert_eq!(render("(set: $b to (text-style: \"bold\"))$b[hi]"), "hi");
        assert_eq!(
            render("(set: $b to (text-style: \"bold\"))$b+(hook: \"a\")[one](replace: ?a)[two]"),
            "two"
        );
    }

    #[test]
    fn bare_changer_variable_is_an_error() {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single("")));
        ctx.enter_passage("Start");
        let err = render_source(
            "(set: $b to (text-style: \"bold\"))$b and so on",
            &mut doc,
            &mut ctx,
        )
        .unwrap_err();
        assert!(err.to_string().contains("changer"), "got: {err}");
    }

    #[test]
    fn hidden_hook_stays_hidden_until_shown() {
        assert_eq!(render("|a)[secret]visible"), "visible");
        assert_eq!(render("|a)[secret](show: ?a)visible"), "secretvisible");
    }

    #[test]
    fn hidden_macro_behaves_like_paren_name() {
        assert_eq!(render("(hidden:)|a>[secret]x(show: ?a)"), "secretx");
    }

    #[test]
    fn named_hook_round_trip() {
        // |foo> then ?foo locates exactly that container.
        assert_eq!(
            render("|foo>[one] and two(replace: ?foo)[three]"),
            "three and two"
        );
    }

    #[test]
    fn styling_wraps_but_text_survives() {
        assert_eq!(render("(text-style: \"bold\")[hi]"), "hi");
    }

    #[test]
    fn payload_changer_without_hook_is_an_error() {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single("")));
        ctx.enter_passage("Start");
        assert!(render_source("(text-style: \"bold\")", &mut doc, &mut ctx).is_err());
    }

    #[test]
    fn display_renders_inline_without_history() {
        let mut story = InMemoryStory::new("Start");
        story.add_passage("Start", "before (display: \"Sub\") after");
        story.add_passage("Sub", "inner");
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(story));
        ctx.enter_passage("Start");
        render_source("before (display: \"Sub\") after", &mut doc, &mut ctx).unwrap();
        assert_eq!(doc.plain_text(), "before inner after");
        assert_eq!(ctx.history(), ["Start".to_string()]);
    }

    #[test]
    fn link_reveal_changer_swaps_on_click() {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single("")));
        ctx.enter_passage("Start");
        render_source("(link: \"Open\")[inside]", &mut doc, &mut ctx).unwrap();
        assert_eq!(doc.plain_text(), "Open");
        let links = doc.links();
        assert_eq!(links.len(), 1);
        let node = links[0].0;
        let cont = doc.take_click(node).unwrap();
        cont(&mut doc, &mut ctx).unwrap();
        assert_eq!(doc.plain_text(), "inside");
    }

    #[test]
    fn visit_counter_resolves() {
        let mut doc = Document::new();
        let mut ctx = Context::new(Box::new(InMemoryStory::single("(print: visits)")));
        ctx.enter_passage("Start");
        render_source("(print: visits)", &mut doc, &mut ctx).unwrap();
        assert_eq!(doc.plain_text(), "1");
    }
}
