/// Lower-case, accent-free, dash-separated form of `input`:
/// `"Liga Pucará 2"` becomes `"liga-pucara-2"`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let Some(folded) = fold(c) else {
            pending_dash = true;
            continue;
        };
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        match folded {
            Folded::Char(c) => slug.push(c),
            Folded::Str(s) => slug.push_str(s),
        }
    }

    slug
}

enum Folded {
    Char(char),
    Str(&'static str),
}

/// ASCII replacement for an already lower-cased character, or `None` for
/// separators and anything without a sensible transliteration.
fn fold(c: char) -> Option<Folded> {
    let folded = match c {
        'a'..='z' | '0'..='9' => return Some(Folded::Char(c)),
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'æ' => return Some(Folded::Str("ae")),
        'ß' => return Some(Folded::Str("ss")),
        _ => return None,
    };
    Some(Folded::Char(folded))
}

/// `base`, `base-2`, `base-3`, ... in order.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((2u32..).map(move |n| format!("{}-{}", base, n)))
}
