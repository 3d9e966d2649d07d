use serde::Serialize;

use crate::menu::MenuNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarItem {
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SidebarItem>>,
}

struct ProjectFrame<'a> {
    nodes: &'a [MenuNode],
    next: usize,
    items: Vec<SidebarItem>,
    /// Item of the node whose children this frame projects.
    owner: Option<SidebarItem>,
}

/// Projects a (filtered) menu into sidebar items, resolving labels with `t`.
///
/// `t` is called once per node in pre-order. An item with projected
/// children becomes a collapsible section and loses its path.
pub fn to_sidebar_items<F>(menu: &[MenuNode], t: F) -> Vec<SidebarItem>
where
    F: Fn(&str) -> String,
{
    let mut stack = vec![ProjectFrame {
        nodes: menu,
        next: 0,
        items: Vec::with_capacity(menu.len()),
        owner: None,
    }];

    while let Some(frame) = stack.last_mut() {
        let nodes = frame.nodes;
        if frame.next < nodes.len() {
            let node = &nodes[frame.next];
            frame.next += 1;
            let item = SidebarItem {
                name: node.key.clone(),
                label: t(&node.label_key),
                icon: node.icon.clone(),
                path: node.path.clone(),
                children: None,
            };
            match node.children.as_deref() {
                Some(children) if !children.is_empty() => stack.push(ProjectFrame {
                    nodes: children,
                    next: 0,
                    items: Vec::with_capacity(children.len()),
                    owner: Some(item),
                }),
                _ => frame.items.push(item),
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let Some(mut owner) = done.owner else {
            return done.items;
        };
        if !done.items.is_empty() {
            owner.path = None;
            owner.children = Some(done.items);
        }
        if let Some(parent) = stack.last_mut() {
            parent.items.push(owner);
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{default_menu, filter_menu_by_roles};
    use std::cell::RefCell;

    fn check_exclusive(items: &[SidebarItem]) {
        for item in items {
            if let Some(children) = &item.children {
                assert!(item.path.is_none(), "{} has both path and children", item.name);
                assert!(!children.is_empty());
                check_exclusive(children);
            }
        }
    }

    #[test]
    fn test_branch_drops_path() {
        let mut hybrid = MenuNode::section("shop", "Shop", vec![MenuNode::leaf("orders", "Orders", "/shop/orders")]);
        hybrid.path = Some("/shop".into());
        let items = to_sidebar_items(&[hybrid], |k| k.to_uppercase());
        assert_eq!(items[0].label, "SHOP");
        assert!(items[0].path.is_none());
        assert_eq!(items[0].children.as_ref().map(|c| c[0].label.as_str()), Some("ORDERS"));
    }

    #[test]
    fn test_empty_children_keep_path() {
        let mut hybrid = MenuNode::section("shop", "Shop", Vec::new());
        hybrid.path = Some("/shop".into());
        let items = to_sidebar_items(&[hybrid], str::to_string);
        assert_eq!(items[0].path.as_deref(), Some("/shop"));
        assert!(items[0].children.is_none());
    }

    #[test]
    fn test_never_both_path_and_children() {
        let sets: [&[&str]; 2] = [&["super_admin"], &["zm_seller"]];
        for roles in sets {
            let filtered = filter_menu_by_roles(&default_menu(), roles);
            check_exclusive(&to_sidebar_items(&filtered, str::to_string));
        }
    }

    #[test]
    fn test_translator_called_in_preorder() {
        let calls = RefCell::new(Vec::new());
        let menu = filter_menu_by_roles(&default_menu(), &["zm_admin"]);
        let items = to_sidebar_items(&menu, |k| {
            calls.borrow_mut().push(k.to_string());
            k.to_string()
        });
        let calls = calls.into_inner();
        assert_eq!(calls.len(), 14);
        assert_eq!(&calls[..3], &["Overview", "Dashboard", "Contact messages"]);
        assert_eq!(calls.last().map(String::as_str), Some("Notifications"));
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn test_sidebar_json_omits_absent_fields() {
        let items = to_sidebar_items(&[MenuNode::leaf("messaging", "Chat", "/messaging")], str::to_string);
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json, serde_json::json!({"name": "messaging", "label": "Chat", "path": "/messaging"}));
    }
}
