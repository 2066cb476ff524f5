//! Built-in utilities.
//!
//! Each one is a thin caller of the namespace. They are mounted under `/bin`
//! and reached by the shell through PATH lookup and `exec`.

mod cat;
mod grep;
mod head;
mod ls;
mod mkdir;
mod mount;
mod mv;
mod rm;
mod search;
mod status;
mod touch;
mod wc;

use super::ToolRegistry;

/// Register all built-in tools with the registry.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(cat::Cat);
    registry.register(head::Head);
    registry.register(head::Tail);
    registry.register(ls::Ls);
    registry.register(ls::Stat);
    registry.register(mkdir::Mkdir);
    registry.register(rm::Rm);
    registry.register(mv::Mv);
    registry.register(mv::Cp);
    registry.register(touch::Touch);
    registry.register(wc::Wc);
    registry.register(grep::Grep);
    registry.register(status::True);
    registry.register(status::False);
    registry.register(search::Search);
    registry.register(mount::Mount);
    registry.register(mount::Umount);
    registry.register(mount::Mounts);
}
