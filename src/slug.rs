use deunicode::deunicode_char;
use std::future::Future;

use crate::error::CatalogError;
use crate::metrics::SLUG_LOOKUPS;

/// Separator placed between words of a slug.
pub const SEPARATOR: char = '-';

/// Answers "who owns this slug?" against the backing store.
///
/// Returns the id of the record using `slug`, or `None` when it is free.
pub trait SlugLookup: Send + Sync {
    fn find_slug_owner(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<String>, CatalogError>> + Send;
}

// Croatian letters and digraphs take precedence over the generic table.
// Input is already lowercased.
fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'č' | 'ć' => "c",
        'š' => "s",
        'ž' => "z",
        'đ' => "dj",
        'ǆ' | 'ǅ' => "dz",
        'ǉ' | 'ǈ' => "lj",
        'ǌ' | 'ǋ' => "nj",
        _ if c.is_alphabetic() => return deunicode_char(c),
        _ => return None,
    };
    Some(s)
}

// Characters that split words. Anything else outside [a-z0-9] is dropped in place,
// so "mama's" stays one word.
fn is_word_break(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '-' | '_' | '/' | '\\' | '|' | '.' | ',' | ':' | ';' | '+' | '=' | '~' | '–' | '—' | '·'
        )
}

/// Turn display text into a lowercase, URL-safe slug made of `[a-z0-9-]`.
///
/// Pure and idempotent. Text with nothing worth keeping yields `""`.
pub fn canonicalize(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_break = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            push_kept(&mut slug, &mut pending_break, c);
        } else if let Some(ascii) = transliterate(c) {
            // the fallback table can hand back capitals, spaces or punctuation
            for part in ascii.chars() {
                if part.is_ascii_alphanumeric() {
                    push_kept(&mut slug, &mut pending_break, part.to_ascii_lowercase());
                } else if is_word_break(part) {
                    pending_break = true;
                }
            }
        } else if is_word_break(c) {
            pending_break = true;
        }
    }
    slug
}

// Leading breaks are swallowed, trailing ones never get flushed.
fn push_kept(slug: &mut String, pending_break: &mut bool, c: char) {
    if *pending_break && !slug.is_empty() {
        slug.push(SEPARATOR);
    }
    *pending_break = false;
    slug.push(c);
}

/// Derive a slug for `text` that no other record uses.
///
/// Tries `base`, then `base-1`, `base-2`, ... until the lookup reports the
/// candidate as free or owned by `exclude_id`. Holds no lock while searching, so
/// two racing callers can land on the same candidate; the store's unique
/// constraint catches that.
pub async fn resolve_unique<L>(
    text: &str,
    lookup: &L,
    exclude_id: Option<&str>,
) -> Result<String, CatalogError>
where
    L: SlugLookup + ?Sized,
{
    let base = canonicalize(text);
    if base.is_empty() {
        return Err(CatalogError::EmptySlug);
    }

    let mut candidate = base.clone();
    let mut suffix: u64 = 0;
    loop {
        SLUG_LOOKUPS.inc();
        match lookup.find_slug_owner(&candidate).await? {
            None => break,
            Some(owner) if exclude_id == Some(owner.as_str()) => break,
            Some(_) => {
                suffix += 1;
                candidate = format!("{base}{SEPARATOR}{suffix}");
            }
        }
    }

    if suffix > 0 {
        tracing::debug!(base = %base, slug = %candidate, "slug taken, using suffixed candidate");
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // slug -> owner id
    #[derive(Default)]
    struct Taken {
        slugs: HashMap<String, String>,
        asked: Mutex<Vec<String>>,
    }

    impl Taken {
        fn with(pairs: &[(&str, &str)]) -> Self {
            Self {
                slugs: pairs
                    .iter()
                    .map(|(s, id)| (s.to_string(), id.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl SlugLookup for Taken {
        async fn find_slug_owner(&self, slug: &str) -> Result<Option<String>, CatalogError> {
            self.asked.lock().unwrap().push(slug.to_string());
            Ok(self.slugs.get(slug).cloned())
        }
    }

    #[test]
    fn canonicalize_examples() {
        assert_eq!(canonicalize("Čevapi"), "cevapi");
        assert_eq!(canonicalize("Šopska Salata"), "sopska-salata");
        assert_eq!(canonicalize("  Sarma  "), "sarma");
        assert_eq!(canonicalize("Recept #1!"), "recept-1");
    }

    #[test]
    fn croatian_letters() {
        assert_eq!(canonicalize("Ćevapi"), "cevapi");
        assert_eq!(canonicalize("Čokoladna Torta"), "cokoladna-torta");
        assert_eq!(canonicalize("Đuveč"), "djuvec");
        assert_eq!(canonicalize("Žito"), "zito");
        assert_eq!(canonicalize("Juha   od   rajčice"), "juha-od-rajcice");
    }

    #[test]
    fn other_accents_map_to_base_letters() {
        assert_eq!(canonicalize("Crème Brûlée"), "creme-brulee");
        assert_eq!(canonicalize("Smørrebrød"), "smorrebrod");
        assert_eq!(canonicalize("Straße"), "strasse");
        // decomposed form: c + combining caron
        assert_eq!(canonicalize("C\u{30C}evapi"), "cevapi");
    }

    #[test]
    fn accents_beyond_latin_1_map_to_base_letters() {
        assert_eq!(canonicalize("Phở bò"), "pho-bo");
        assert_eq!(canonicalize("Bánh mì chả"), "banh-mi-cha");
        assert_eq!(canonicalize("Gỏi cuốn"), "goi-cuon");
    }

    #[test]
    fn croatian_digraph_code_points() {
        assert_eq!(canonicalize("ǈuta paprika"), "ljuta-paprika");
        assert_eq!(canonicalize("Ǌoki"), "njoki");
        assert_eq!(canonicalize("Ǆem od šljiva"), "dzem-od-sljiva");
        assert_eq!(canonicalize("ǅem"), "dzem");
    }

    #[test]
    fn apostrophes_do_not_split_words() {
        assert_eq!(canonicalize("Mama's Kolač"), "mamas-kolac");
    }

    #[test]
    fn separators_collapse_and_trim() {
        assert_eq!(canonicalize("--Burek -- s _ mesom--"), "burek-s-mesom");
        assert_eq!(canonicalize("a.b/c"), "a-b-c");
        assert_eq!(canonicalize("5 minuta palačinke"), "5-minuta-palacinke");
    }

    #[test]
    fn nothing_retainable_is_empty() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize("#!?* -- ''"), "");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs = [
            "Čevapi",
            "Šopska Salata",
            "  Sarma  ",
            "Recept #1!",
            "Mama's Kolač",
            "--a--b--",
            "Đ Æ Œ ß",
            "Phở bò",
            "ǈuta ǋoki",
            "already-a-slug-2",
            "",
        ];
        for input in inputs {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "input {input:?}");
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            );
        }
    }

    #[tokio::test]
    async fn free_base_is_returned() {
        let taken = Taken::default();
        assert_eq!(resolve_unique("Sarma", &taken, None).await.unwrap(), "sarma");
    }

    #[tokio::test]
    async fn suffixes_until_free() {
        let taken = Taken::with(&[("sarma", "r1"), ("sarma-1", "r2")]);
        let slug = resolve_unique("Sarma", &taken, None).await.unwrap();

        assert_eq!(slug, "sarma-2");
        assert_eq!(*taken.asked.lock().unwrap(), ["sarma", "sarma-1", "sarma-2"]);
    }

    #[tokio::test]
    async fn excluded_record_keeps_its_slug() {
        let taken = Taken::with(&[("sarma", "r1")]);
        let slug = resolve_unique("Sarma", &taken, Some("r1")).await.unwrap();
        assert_eq!(slug, "sarma");

        let slug = resolve_unique("Sarma", &taken, Some("r9")).await.unwrap();
        assert_eq!(slug, "sarma-1");
    }

    #[tokio::test]
    async fn excluded_record_on_suffixed_candidate() {
        let taken = Taken::with(&[("sarma", "r1"), ("sarma-1", "r2")]);
        let slug = resolve_unique("Sarma", &taken, Some("r2")).await.unwrap();
        assert_eq!(slug, "sarma-1");
    }

    #[tokio::test]
    async fn empty_slug_is_rejected() {
        let taken = Taken::default();
        let err = resolve_unique("?!#", &taken, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::EmptySlug));
        assert!(taken.asked.lock().unwrap().is_empty());
    }
}
