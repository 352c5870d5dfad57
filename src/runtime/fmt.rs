//! Formatting for runtime values.

use std::collections::HashSet;

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use super::{
    char::decode_utf8,
    number::{decode_word, Number},
    object::{
        BlockRef, HeapKind, ADT_MODULE_OFFSET, ADT_TYPE_OFFSET, ADT_VARIANT_OFFSET,
        CHAR_UTF8_OFFSET, RECORD_MODULE_OFFSET, RECORD_TYPE_OFFSET,
    },
    value::{Value, Word},
};

const WIDTH: usize = 70;
/// Composites nested deeper than this print as `...`; the printer recurses.
const MAX_DEPTH: usize = 64;

pub fn pretty(value: &Value, out: &mut dyn WriteColor) -> Result<(), std::io::Error> {
    let allocator = BoxAllocator;
    {
        pretty_inner(value.word(), &allocator, &mut HashSet::new(), 0)
            .1
            .render_colored(WIDTH, out)?;
    }
    Ok(())
}

fn colored(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec
}

fn number_text(number: Number) -> String {
    match number {
        Number::Simple(x) | Number::Int64(x) => x.to_string(),
        Number::Int32(x) => x.to_string(),
        Number::Float32(x) => format!("{:?}", x),
        Number::Float64(x) => format!("{:?}", x),
        Number::Rational(n, d) => format!("{}/{}", n, d),
    }
}

fn pretty_inner<'b, D>(
    val: Word,
    allocator: &'b D,
    path: &mut HashSet<usize>,
    depth: usize,
) -> DocBuilder<'b, D, ColorSpec>
where
    D: DocAllocator<'b, ColorSpec>,
    D::Doc: Clone,
{
    if let Some(number) = decode_word(val) {
        return allocator.text(number_text(number)).annotate(colored(Color::Cyan));
    }

    if !val.is_heap_ptr() {
        let text = if val == Word::TRUE {
            "true"
        } else if val == Word::FALSE {
            "false"
        } else if val.is_void() {
            "()"
        } else if val.is_empty() {
            "<empty>"
        } else {
            "<unknown>"
        };
        return allocator.text(text).annotate(colored(Color::Magenta));
    }

    let block = val.block();
    match block.kind() {
        HeapKind::String => {
            let text = String::from_utf8_lossy(unsafe { block.bytes() });
            allocator.text(format!("{:?}", text)).annotate(colored(Color::Green))
        }
        HeapKind::Char => {
            let code = decode_utf8(block.u32_at(CHAR_UTF8_OFFSET)).ok();
            match code.and_then(char::from_u32) {
                Some(c) => allocator.text(format!("{:?}", c)).annotate(colored(Color::Green)),
                None => allocator.text("<malformed char>"),
            }
        }
        HeapKind::Bytes => {
            let mut doc = allocator.nil();
            for byte in unsafe { block.bytes() } {
                doc = doc
                    .append(allocator.space())
                    .append(allocator.text(format!("{:02x}", byte)));
            }
            allocator.text("<bytes").append(doc).append(allocator.text(">"))
        }
        HeapKind::BoxedNum => allocator.text("<number>"),
        HeapKind::Closure => allocator.text("<lambda>"),
        HeapKind::Tuple => fields(block, allocator, path, depth, "(", ")"),
        HeapKind::Array => fields(block, allocator, path, depth, "[> ", "]"),
        HeapKind::Record => {
            let header = format!(
                "<record {}:{}>{{",
                block.u32_at(RECORD_MODULE_OFFSET),
                block.u32_at(RECORD_TYPE_OFFSET)
            );
            fields(block, allocator, path, depth, header, "}")
        }
        HeapKind::Adt => {
            let header = format!(
                "<variant {}:{}:{}>(",
                block.u32_at(ADT_MODULE_OFFSET),
                block.u32_at(ADT_TYPE_OFFSET),
                block.u32_at(ADT_VARIANT_OFFSET)
            );
            fields(block, allocator, path, depth, header, ")")
        }
    }
}

fn fields<'b, D>(
    block: BlockRef,
    allocator: &'b D,
    path: &mut HashSet<usize>,
    depth: usize,
    open: impl Into<String>,
    close: &'static str,
) -> DocBuilder<'b, D, ColorSpec>
where
    D: DocAllocator<'b, ColorSpec>,
    D::Doc: Clone,
{
    if depth >= MAX_DEPTH {
        return allocator.text("...");
    }
    if !path.insert(block.addr()) {
        return allocator.text("<cycle>");
    }

    let mut doc = allocator.nil();
    for (i, field) in block.fields().enumerate() {
        if i > 0 {
            doc = doc.append(allocator.text(",")).append(allocator.line());
        }
        doc = doc.append(pretty_inner(field, allocator, path, depth + 1));
    }
    path.remove(&block.addr());

    allocator
        .text(open.into())
        .append(doc.nest(2).group())
        .append(allocator.text(close))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let allocator = BoxAllocator;
        {
            pretty_inner(self.word(), &allocator, &mut HashSet::new(), 0)
                .1
                .render_fmt(WIDTH, f)?;
        }
        Ok(())
    }
}
