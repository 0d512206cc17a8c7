//! URL classification into auth, action and CRUD endpoints.

/// Flavor of an authentication endpoint, selecting its canned body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
    Password,
    Generic,
}

/// Flavor of a state-transition endpoint, selecting its canned body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Activate,
    Deactivate,
    Approve,
    Reject,
    Publish,
    Archive,
    Send,
    Generic,
}

/// Exactly one category per URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Auth(AuthKind),
    Action(ActionKind),
    Crud,
}

/// Ordered auth keywords.
const AUTH_KEYWORDS: &[(&str, AuthKind)] = &[
    ("login", AuthKind::Login),
    ("signin", AuthKind::Login),
    ("sign-in", AuthKind::Login),
    ("logout", AuthKind::Generic),
    ("signout", AuthKind::Generic),
    ("sign-out", AuthKind::Generic),
    ("register", AuthKind::Register),
    ("signup", AuthKind::Register),
    ("sign-up", AuthKind::Register),
    ("forgot-password", AuthKind::Password),
    ("reset-password", AuthKind::Password),
    ("change-password", AuthKind::Password),
    ("forgot", AuthKind::Password),
    ("reset", AuthKind::Password),
    ("password", AuthKind::Password),
    ("verify", AuthKind::Generic),
    ("verification", AuthKind::Generic),
    ("refresh-token", AuthKind::Generic),
    ("token", AuthKind::Generic),
    ("oauth", AuthKind::Generic),
    ("auth", AuthKind::Generic),
];

/// Ordered action keywords.
const ACTION_KEYWORDS: &[(&str, ActionKind)] = &[
    ("deactivate", ActionKind::Deactivate),
    ("activate", ActionKind::Activate),
    ("approve", ActionKind::Approve),
    ("reject", ActionKind::Reject),
    ("publish", ActionKind::Publish),
    ("unpublish", ActionKind::Generic),
    ("archive", ActionKind::Archive),
    ("send", ActionKind::Send),
    ("export", ActionKind::Generic),
    ("import", ActionKind::Generic),
    ("cancel", ActionKind::Generic),
    ("submit", ActionKind::Generic),
    ("restore", ActionKind::Generic),
    ("duplicate", ActionKind::Generic),
    ("sync", ActionKind::Generic),
];

/// Classify a URL. Auth keywords are tried before action keywords; anything
/// else is CRUD.
pub fn classify(url: &str) -> Category {
    let segments = path_segments(url);
    let scope = Scope::new(url, &segments);

    if let Some(kind) = first_hit(&scope, AUTH_KEYWORDS) {
        return Category::Auth(kind);
    }
    if let Some(kind) = first_hit(&scope, ACTION_KEYWORDS) {
        return Category::Action(kind);
    }
    Category::Crud
}

/// Default status for a method and category.
pub fn status_for(method: &str, category: Category) -> u16 {
    match (method, category) {
        ("DELETE", _) => 204,
        ("POST", Category::Crud) => 201,
        _ => 200,
    }
}

/// Non-empty path segments, with any query string or fragment removed.
pub(crate) fn path_segments(url: &str) -> Vec<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// What a keyword is tested against: the whole lowercased URL as text, plus
/// a token view of its segments (all of them for prefix hits, the last two
/// for hits anywhere inside them) so `sign_in` and `resetPassword` still
/// match `sign-in` and `reset-password`.
struct Scope {
    url: String,
    all: Vec<Vec<String>>,
    tail: Vec<Vec<String>>,
}

impl Scope {
    fn new(url: &str, segments: &[&str]) -> Self {
        let all: Vec<Vec<String>> = segments.iter().map(|s| tokenize(s)).collect();
        let tail = all[all.len().saturating_sub(2)..].to_vec();
        Self {
            url: url.to_ascii_lowercase(),
            all,
            tail,
        }
    }

    fn hits(&self, keyword: &str) -> bool {
        if self.url.contains(keyword) {
            return true;
        }
        let keyword = tokenize(keyword);
        self.tail.iter().any(|tokens| contains_run(tokens, &keyword))
            || self.all.iter().any(|tokens| tokens.starts_with(&keyword))
    }
}

fn first_hit<K: Copy>(scope: &Scope, keywords: &[(&str, K)]) -> Option<K> {
    keywords
        .iter()
        .find(|(keyword, _)| scope.hits(keyword))
        .map(|(_, kind)| *kind)
}

fn contains_run(tokens: &[String], run: &[String]) -> bool {
    !run.is_empty() && tokens.windows(run.len()).any(|w| w == run)
}

/// Split a segment into lowercase words on punctuation and camelCase
/// boundaries: `resetPassword` and `reset-password` both give
/// `["reset", "password"]`.
fn tokenize(segment: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in segment.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
