//! HTML, SVG and MathML tag tables.

use phf::phf_set;

static HTML_TAGS: phf::Set<&'static str> = phf_set! {
    "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
    "aside", "footer", "header", "hgroup", "h1", "h2", "h3", "h4", "h5", "h6", "nav",
    "section", "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img",
    "li", "main", "ol", "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite",
    "code", "data", "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp",
    "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr", "area", "audio",
    "map", "track", "video", "embed", "object", "param", "source", "canvas", "script",
    "noscript", "del", "ins", "caption", "col", "colgroup", "table", "thead", "tbody", "td",
    "th", "tr", "button", "datalist", "fieldset", "form", "input", "label", "legend",
    "meter", "optgroup", "option", "output", "progress", "select", "textarea", "details",
    "dialog", "menu", "summary", "template", "blockquote", "iframe", "tfoot",
};

static SVG_TAGS: phf::Set<&'static str> = phf_set! {
    "svg", "animate", "animateMotion", "animateTransform", "circle", "clipPath",
    "color-profile", "defs", "desc", "discard", "ellipse", "feBlend", "feColorMatrix",
    "feComponentTransfer", "feComposite", "feConvolveMatrix", "feDiffuseLighting",
    "feDisplacementMap", "feDistanceLight", "feDropShadow", "feFlood", "feFuncA", "feFuncB",
    "feFuncG", "feFuncR", "feGaussianBlur", "feImage", "feMerge", "feMergeNode",
    "feMorphology", "feOffset", "fePointLight", "feSpecularLighting", "feSpotLight",
    "feTile", "feTurbulence", "filter", "foreignObject", "g", "hatch", "hatchpath", "image",
    "line", "linearGradient", "marker", "mask", "mesh", "meshgradient", "meshpatch",
    "meshrow", "metadata", "mpath", "path", "pattern", "polygon", "polyline",
    "radialGradient", "rect", "set", "solidcolor", "stop", "switch", "symbol", "text",
    "textPath", "title", "tspan", "unknown", "use", "view",
};

static MATH_ML_TAGS: phf::Set<&'static str> = phf_set! {
    "math", "maction", "annotation", "annotation-xml", "menclose", "merror", "mfenced",
    "mfrac", "mi", "mmultiscripts", "mn", "mo", "mover", "mpadded", "mphantom", "mroot",
    "mrow", "ms", "mspace", "msqrt", "mstyle", "msub", "msubsup", "msup", "mtable", "mtd",
    "mtext", "mtr", "munder", "munderover", "semantics", "mglyph", "malignmark",
};

static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
};

/// Attributes rendered by presence only.
static BOOLEAN_ATTRS: phf::Set<&'static str> = phf_set! {
    "itemscope", "allowfullscreen", "formnovalidate", "ismap", "nomodule", "novalidate",
    "readonly", "async", "autofocus", "autoplay", "controls", "default", "defer", "disabled",
    "hidden", "inert", "loop", "open", "required", "reversed", "scoped", "seamless",
    "checked", "muted", "multiple", "selected",
};

#[inline]
pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag)
}

#[inline]
pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(tag)
}

#[inline]
pub fn is_math_ml_tag(tag: &str) -> bool {
    MATH_ML_TAGS.contains(tag)
}

#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Native platform tag: HTML or SVG.
#[inline]
pub fn is_native_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg_tag(tag)
}

#[inline]
pub fn is_boolean_attr(name: &str) -> bool {
    BOOLEAN_ATTRS.contains(name)
}

/// Attribute names that can be printed into server-rendered markup as is.
pub fn is_ssr_safe_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '>' | '/' | '=' | '"' | '\'' | '\t' | '\n' | '\x0c' | ' '))
}
