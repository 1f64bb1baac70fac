//! Visible cursor overlay for watching synthesized motion in a headed browser.

/// Installs `#reach-cursor` and `window.reachCursor(x, y, color)`.
pub const INSTALL_SCRIPT: &str = r#"
    (() => {
        if (document.getElementById('reach-cursor')) return;
        const mount = () => {
            const dot = document.createElement('div');
            dot.id = 'reach-cursor';
            dot.setAttribute('style', 'position:fixed; z-index:2147483647; pointer-events:none; width:18px; height:18px; border-radius:50%; background:red; box-shadow:0 0 10px rgba(255,0,0,.5); transform:translate(-50%,-50%); left:-50px; top:-50px;');
            document.body.appendChild(dot);
        };
        if (document.body) mount(); else document.addEventListener('DOMContentLoaded', mount);
        window.reachCursor = (x, y, color) => {
            const dot = document.getElementById('reach-cursor');
            if (!dot) return;
            dot.style.left = x + 'px';
            dot.style.top = y + 'px';
            if (color) dot.style.background = color;
        };
    })();
"#;

/// Colour shown while the pointer travels.
pub const MOVING: &str = "red";
/// Colour shown at the moment of a click.
pub const PRESSED: &str = "blue";

pub fn update_script(x: f64, y: f64, color: &str) -> String {
    format!("if (window.reachCursor) window.reachCursor({x:.1}, {y:.1}, '{color}');")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_script_formats_coordinates() {
        assert_eq!(
            update_script(10.0, 20.5, PRESSED),
            "if (window.reachCursor) window.reachCursor(10.0, 20.5, 'blue');"
        );
    }
}
