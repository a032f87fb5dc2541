//! Relative links between unit pages and reference resolution.

use crate::mapper::{Unit, UnitGraph, UnitId};
use crate::qualpath::QualPath;

/// Relative link from the page of `from` to the page of `to`.
///
/// The common prefix is trimmed, every remaining segment of `from` becomes a
/// `../` hop and the remaining segments of `to` are joined with `/`.
pub fn relative_link(from: &QualPath, to: &QualPath) -> String {
    let common = from.common_prefix_len(to);
    let mut link = "../".repeat(from.len() - common);
    for (index, part) in to.parts().skip(common).enumerate() {
        if index > 0 {
            link.push('/');
        }
        link.push_str(part);
    }
    if link.is_empty() {
        link.push('.');
    }
    link
}

/// Page a unit is shown on, and its anchor there.
///
/// Functions, properties and attributes of a module or type live on their
/// parent's page under `#name`; modules and types get their own page.
pub fn page_and_anchor(graph: &UnitGraph, unit: &Unit) -> (QualPath, Option<String>) {
    if !unit.kind.is_directory() && unit.path.len() > 1 {
        let parent = unit.path.parent();
        let parent_is_page = graph
            .lookup(&parent)
            .and_then(|id| graph.get(id))
            .is_some_and(|parent| parent.kind.is_directory());
        if parent_is_page {
            return (parent, Some(unit.name().to_string()));
        }
    }
    (unit.path.clone(), None)
}

/// File of the page at `to`, relative to the page at `from`.
///
/// Pages are written as `<segments>/index.html`, so the file name is spelled
/// out for sites browsed without a server.
pub fn page_href(from: &QualPath, to: &QualPath) -> String {
    match relative_link(from, to).as_str() {
        "." => "index.html".to_string(),
        link => format!("{link}/index.html"),
    }
}

/// Link from `page` to `target`, anchored when `extended`.
pub fn link_to(graph: &UnitGraph, page: &QualPath, target: &Unit, extended: bool) -> String {
    if !extended {
        return page_href(page, &target.path);
    }
    match page_and_anchor(graph, target) {
        (target_page, Some(anchor)) if &target_page == page => format!("#{anchor}"),
        (target_page, Some(anchor)) => format!("{}#{anchor}", page_href(page, &target_page)),
        (target_page, None) => page_href(page, &target_page),
    }
}

/// Resolve a double-grave reference written at `from`.
///
/// Tried in order: the exact path, the path relative to `from` and each of
/// its parents, then a suffix matching exactly one unit.
pub fn resolve_reference(graph: &UnitGraph, from: &QualPath, target: &str) -> Option<UnitId> {
    let target = QualPath::parse(target.trim()).ok()?;
    if target.is_empty() {
        return None;
    }
    if let Some(id) = graph.lookup(&target) {
        return Some(id);
    }

    let mut base = from.clone();
    while !base.is_empty() {
        if let Some(id) = graph.lookup(&(&base / &target)) {
            return Some(id);
        }
        base = base.parent();
    }

    let mut found: Option<UnitId> = None;
    for (path, id) in graph.paths() {
        if path.len() < target.len() || path.skip(path.len() - target.len()) != target {
            continue;
        }
        match found {
            Some(existing) if existing != id => return None,
            _ => found = Some(id),
        }
    }
    found
}

/// Resolve a single-grave name against the references of `unit`, then of
/// its parent for members without references of their own.
pub fn resolve_local_reference(graph: &UnitGraph, unit: &Unit, name: &str) -> Option<UnitId> {
    let mut parts = name.trim().split('.');
    let first = parts.next()?;

    let mut current = unit.reference(first).or_else(|| {
        if unit.kind.is_directory() {
            return None;
        }
        let parent = graph.lookup(&unit.path.parent())?;
        graph.get(parent)?.reference(first)
    })?;

    for part in parts {
        current = graph.get(current)?.reference(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::UnitKind;

    fn path(value: &str) -> QualPath {
        QualPath::parse(value).unwrap()
    }

    fn graph() -> UnitGraph {
        let mut graph = UnitGraph::new();
        for (kind, value) in [
            (UnitKind::Module, "hata"),
            (UnitKind::Module, "hata.discord"),
            (UnitKind::Type, "hata.discord.Guild"),
            (UnitKind::Function, "hata.discord.Guild.get_channel"),
            (UnitKind::Property, "hata.discord.Guild.name"),
            (UnitKind::Type, "hata.discord.Channel"),
            (UnitKind::Property, "hata.discord.Channel.name"),
        ] {
            graph.insert(kind, path(value));
        }
        graph
    }

    fn unit<'g>(graph: &'g UnitGraph, value: &str) -> &'g Unit {
        graph.get(graph.lookup_str(value).unwrap()).unwrap()
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(relative_link(&path("a.b.c"), &path("a.d")), "../../d");
        assert_eq!(relative_link(&path("a.b"), &path("a.b.c")), "c");
        assert_eq!(relative_link(&path("a"), &path("x.y")), "../x/y");
        assert_eq!(relative_link(&path("a.b"), &path("a.b")), ".");
    }

    #[test]
    fn test_page_href_names_index_file() {
        assert_eq!(page_href(&path("a.b.c"), &path("a.d")), "../../d/index.html");
        assert_eq!(page_href(&path("a.b"), &path("a.b")), "index.html");
    }

    #[test]
    fn test_extended_links() {
        let graph = graph();
        let page = path("hata.discord.Guild");
        let method = unit(&graph, "hata.discord.Guild.get_channel");
        assert_eq!(link_to(&graph, &page, method, true), "#get_channel");
        assert_eq!(link_to(&graph, &page, method, false), "get_channel/index.html");

        let other = unit(&graph, "hata.discord.Channel.name");
        assert_eq!(link_to(&graph, &page, other, true), "../Channel/index.html#name");

        let channel = unit(&graph, "hata.discord.Channel");
        assert_eq!(link_to(&graph, &page, channel, true), "../Channel/index.html");
    }

    #[test]
    fn test_resolve_order() {
        let graph = graph();
        let from = path("hata.discord.Guild.get_channel");
        let exact = resolve_reference(&graph, &from, "hata.discord.Channel");
        assert_eq!(exact, graph.lookup_str("hata.discord.Channel"));

        // Relative to a parent of the current path.
        let relative = resolve_reference(&graph, &from, "Channel.name");
        assert_eq!(relative, graph.lookup_str("hata.discord.Channel.name"));

        // Relative wins over the ambiguous suffix.
        let own = resolve_reference(&graph, &from, "name");
        assert_eq!(own, graph.lookup_str("hata.discord.Guild.name"));

        let suffix = resolve_reference(&graph, &path("elsewhere"), "Guild.get_channel");
        assert_eq!(suffix, graph.lookup_str("hata.discord.Guild.get_channel"));

        assert_eq!(resolve_reference(&graph, &path("elsewhere"), "name"), None);
        assert_eq!(resolve_reference(&graph, &from, "Missing"), None);
        assert_eq!(resolve_reference(&graph, &from, "a..b"), None);
    }

    #[test]
    fn test_resolve_local() {
        let graph = graph();
        let guild = unit(&graph, "hata.discord.Guild");
        assert_eq!(
            resolve_local_reference(&graph, guild, "get_channel"),
            graph.lookup_str("hata.discord.Guild.get_channel")
        );

        let method = unit(&graph, "hata.discord.Guild.get_channel");
        assert_eq!(
            resolve_local_reference(&graph, method, "name"),
            graph.lookup_str("hata.discord.Guild.name")
        );
        assert_eq!(resolve_local_reference(&graph, method, "channel_id"), None);
    }
}
