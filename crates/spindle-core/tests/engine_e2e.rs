//! End-to-end tests driving whole stories through the public [`Engine`]
//! API: render, read the plain-text projection, click links, repeat.

use spindle_core::{Engine, InMemoryStory, OutputFormatter, PlainText, Rendered};

fn run_single(source: &str) -> Rendered {
    let mut engine = Engine::new(Box::new(InMemoryStory::single(source)));
    engine.start().expect("render failed");
    PlainText.format(engine.document())
}

fn text_of(source: &str) -> String {
    run_single(source).text
}

#[test]
fn plain_text_and_macros() {
    assert_eq!(text_of("(print: 54)"), "54");
    assert_eq!(text_of("(print: \"Red\" + \"belly\")"), "Redbelly");
    assert_eq!(text_of("(print: (a: 1, 2) + (a: 3))"), "[1, 2, 3]");
    assert_eq!(text_of("(str: 2 * 3 + 1)"), "7");
}

#[test]
fn set_then_it_arithmetic() {
    assert_eq!(text_of("(set: $x to 1)(set: $x to it + 1)$x"), "2");
}

#[test]
fn conditional_chain_picks_one_branch() {
    let src = "(if: false)[no](else-if: true)[yes](else:)[never]";
    assert_eq!(text_of(src), "yes");
}

#[test]
fn named_hook_replaced_in_place() {
    assert_eq!(text_of("|a>[hi] (replace: ?a)[bye]"), "bye ");
}

#[test]
fn collapsed_whitespace() {
    assert_eq!(text_of("{a\n   b}"), "a b");
}

#[test]
fn links_are_listed_and_clickable() {
    let mut story = InMemoryStory::new("Start");
    story.add_passage("Start", "Upstairs. [[Go to the cellar->Cellar]]");
    story.add_passage("Cellar", "Dark down here. [[Back->Start]]");
    let mut engine = Engine::new(Box::new(story));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    assert_eq!(out.text, "Upstairs. Go to the cellar");
    assert_eq!(out.links.len(), 1);
    assert_eq!(out.links[0].text, "Go to the cellar");

    engine.click(out.links[0].node).unwrap();
    let out = PlainText.format(engine.document());
    assert_eq!(out.text, "Dark down here. Back");
    assert_eq!(out.links[0].text, "Back");
}

#[test]
fn globals_survive_navigation() {
    let mut story = InMemoryStory::new("Start");
    story.add_passage("Start", "(set: $gold to 30)[[Shop]]");
    story.add_passage("Shop", "You have $gold gold.");
    let mut engine = Engine::new(Box::new(story));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    engine.click(out.links[0].node).unwrap();
    assert_eq!(PlainText.format(engine.document()).text, "You have 30 gold.");
}

#[test]
fn locals_do_not_survive_navigation() {
    let mut story = InMemoryStory::new("Start");
    story.add_passage("Start", "(set: _tmp to 9)[[Next]]");
    story.add_passage("Next", "(print: _tmp)");
    let mut engine = Engine::new(Box::new(story));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    let err = engine.click(out.links[0].node).unwrap_err();
    assert!(err.to_string().contains("_tmp"), "got: {err}");
}

#[test]
fn history_and_visited_track_navigation() {
    let mut story = InMemoryStory::new("Start");
    story.add_passage("Start", "[[Hall]]");
    story.add_passage(
        "Hall",
        "(print: (history:))/(print: (visited: \"Hall\"))/(print: (visited: \"Crypt\"))",
    );
    let mut engine = Engine::new(Box::new(story));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    engine.click(out.links[0].node).unwrap();
    assert_eq!(
        PlainText.format(engine.document()).text,
        "[Start, Hall]/true/false"
    );
}

#[test]
fn hidden_hook_revealed_by_show() {
    let src = "always|secret)[ hidden](link: \"peek\")[(show: ?secret)]";
    let mut engine = Engine::new(Box::new(InMemoryStory::single(src)));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    assert_eq!(out.text, "alwayspeek");
    engine.click(out.links[0].node).unwrap();
    assert_eq!(PlainText.format(engine.document()).text, "always hidden");
}

#[test]
fn link_macro_replaces_itself_with_body() {
    let src = "(link: \"open the box\")[a moth flies out]";
    let mut engine = Engine::new(Box::new(InMemoryStory::single(src)));
    engine.start().unwrap();

    let out = PlainText.format(engine.document());
    assert_eq!(out.text, "open the box");
    engine.click(out.links[0].node).unwrap();

    let out = PlainText.format(engine.document());
    assert_eq!(out.text, "a moth flies out");
    assert!(out.links.is_empty());
}

#[test]
fn for_loop_with_where_filter() {
    let src = "(for: each _n where it % 2 is 0, ...(range: 1, 6))[_n ]";
    assert_eq!(text_of(src), "2 4 6 ");
}

#[test]
fn display_renders_without_touching_history() {
    let mut story = InMemoryStory::new("Start");
    story.add_passage("Start", "(display: \"Sign\")(print: (visited: \"Sign\"))");
    story.add_passage("Sign", "BEWARE ");
    let mut engine = Engine::new(Box::new(story));
    engine.start().unwrap();
    assert_eq!(PlainText.format(engine.document()).text, "BEWARE false");
}

#[test]
fn seeded_random_is_reproducible() {
    let src = "(print: (random: 1, 100)) (print: (either: \"a\", \"b\", \"c\"))";
    let render = |seed| {
        let mut engine = Engine::new(Box::new(InMemoryStory::single(src)));
        engine.seed_random(seed);
        engine.start().unwrap();
        PlainText.format(engine.document()).text
    };
    assert_eq!(render(7), render(7));

    let parts: Vec<String> = render(7).split(' ').map(String::from).collect();
    let n: i64 = parts[0].parse().expect("first part is a number");
    assert!((1..=100).contains(&n));
    assert!(["a", "b", "c"].contains(&parts[1].as_str()));
}

#[test]
fn revision_targets_rendered_content() {
    assert_eq!(
        text_of("cat and cat(replace: \"cat\")[dog]"),
        "dog and dog"
    );
    assert_eq!(text_of("|a>[one](append: ?a)[ two]"), "one two");
    assert_eq!(text_of("|a>[one](prepend: ?a)[zero ]"), "zero one");
}

#[test]
fn styled_replacement_body_with_the_needle_inside() {
    let src = "cat(replace: \"cat\")[(text-style: \"bold\")[cat]]";
    assert_eq!(text_of(src), "cat");
}

#[test]
fn changer_in_a_variable_heads_a_hook() {
    assert_eq!(
        text_of("(set: $warn to (text-colour: \"#ff0000\"))$warn[look out]"),
        "look out"
    );
}

#[test]
fn changers_wrap_but_keep_text_visible() {
    assert_eq!(
        text_of("(text-colour: \"#ff0000\")[warning]"),
        "warning"
    );
    assert_eq!(text_of("(text-style: \"bold\")+(font: \"serif\")[x]"), "x");
}

#[test]
fn missing_passage_is_an_error() {
    let mut engine = Engine::new(Box::new(InMemoryStory::single("hi")));
    let err = engine.goto("Nowhere").unwrap_err();
    assert!(err.to_string().contains("Nowhere"));
}

#[test]
fn bad_macro_name_reports_arity() {
    let mut engine = Engine::new(Box::new(InMemoryStory::single("(frobnicate: 1, 2)")));
    let err = engine.start().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("frobnicate") && msg.contains("2"), "got: {msg}");
}
