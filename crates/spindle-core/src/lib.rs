//! Interpreter for the Harlowe passage dialect: tagged values, the
//! operator-sequence expression evaluator, macro dispatch by name and
//! argument shape, the passage grammar and renderer, and the live document
//! tree that revision macros and reader interaction mutate in place.

pub mod context;
pub mod document;
pub mod error;
pub mod expr;
pub mod macros;
pub mod output;
pub mod passage;
pub mod render;
pub mod story;
pub mod value;

pub use context::Context;
pub use document::{Cursor, Document, NodeId, Place};
pub use error::EngineError;
pub use output::{LinkRef, OutputFormatter, PlainText, Rendered};
pub use story::{InMemoryStory, StoryManifest, StorySource};
pub use value::Data;

/// One running story: a document, a context, and the render loop between
/// them.
pub struct Engine {
    doc: Document,
    ctx: Context,
}

impl Engine {
    pub fn new(story: Box<dyn StorySource>) -> Engine {
        Engine {
            doc: Document::new(),
            ctx: Context::new(story),
        }
    }

    /// Reseed `(random:)` and `(either:)`, for reproducible runs.
    pub fn seed_random(&mut self, seed: u64) {
        self.ctx.seed_random(seed);
    }

    /// Render the story's start passage.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let start = self.ctx.story().start_passage().to_string();
        self.goto(&start)
    }

    /// Clear the document and render the named passage into it.
    pub fn goto(&mut self, name: &str) -> Result<(), EngineError> {
        let source = self
            .ctx
            .story()
            .passage_source(name)
            .ok_or_else(|| EngineError::NoSuchPassage(name.to_string()))?
            .to_string();
        self.doc.clear();
        self.ctx.enter_passage(name);
        render::render_source(&source, &mut self.doc, &mut self.ctx)
    }

    /// Invoke the interaction registered on a node. The cursor is placed
    /// inside the node first, so the continuation's writes land there.
    pub fn click(&mut self, node: NodeId) -> Result<(), EngineError> {
        let Some(cont) = self.doc.take_click(node) else {
            return Err(EngineError::eval("nothing to click there"));
        };
        self.doc.set_cursor(Cursor {
            node,
            place: Place::Child(0),
        });
        cont(&mut self.doc, &mut self.ctx)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}
