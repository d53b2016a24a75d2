//! The in-page snapshot procedure (§4.3.1, §9 "Open question")
//!
//! Delivered as a literal source string — never passed through `format!` or a
//! template engine — so a build step cannot mangle its identifiers and break
//! its in-page execution context. This is the richer of the two snapshot
//! implementations the source carried (tier-aware filtering, select options,
//! shadow-DOM traversal, noise-role rejection); the simpler one is not
//! reproduced here at all.

/// Evaluated via `Runtime.evaluate` against the page's main execution context.
/// Returns a JSON string matching `browser::snapshot::Snapshot`'s shape.
pub const SNAPSHOT_SCRIPT: &str = r#"
(function() {
  try {
    var NOISE_ROLES = ["presentation", "none", "img", "list", "listitem", "row",
      "group", "region", "figure", "separator", "note", "status", "log",
      "timer", "tooltip", "generic"];
    var ACTIONABLE_ROLES = ["button", "link", "tab", "menuitem", "option",
      "checkbox", "radio", "combobox", "searchbox", "textbox", "slider", "switch"];
    var CLICKABLE_TAGS = ["a", "button", "input", "select", "textarea", "label"];

    var vh = window.innerHeight || document.documentElement.clientHeight;
    var vw = window.innerWidth || document.documentElement.clientWidth;

    function nearViewport(rect) {
      return rect.bottom >= -vh && rect.top <= vh * 3 &&
        rect.right >= -100 && rect.left <= vw + 100;
    }

    var maxUid = 0;
    document.querySelectorAll("[data-edith-uid]").forEach(function(el) {
      var n = parseInt(el.getAttribute("data-edith-uid"), 10);
      if (!isNaN(n) && n > maxUid) maxUid = n;
    });
    var nextUid = maxUid + 1;

    function isVisible(el) {
      var rect = el.getBoundingClientRect();
      if (rect.width === 0 && rect.height === 0) return false;
      var style = window.getComputedStyle(el);
      if (style.display === "none" || style.visibility === "hidden" || style.opacity === "0") {
        return false;
      }
      return true;
    }

    function ariaRole(el) {
      var explicit = el.getAttribute("role");
      if (explicit) return explicit.toLowerCase();
      return null;
    }

    function isActionable(el) {
      var tag = el.tagName.toLowerCase();
      if (CLICKABLE_TAGS.indexOf(tag) !== -1) return true;
      if (el.hasAttribute("onclick")) return true;
      var role = ariaRole(el);
      if (role && ACTIONABLE_ROLES.indexOf(role) !== -1) return true;
      if (el.isContentEditable) return true;
      if (tag === "video") return true;
      return false;
    }

    function isNoise(el) {
      var role = ariaRole(el);
      return role !== null && NOISE_ROLES.indexOf(role) !== -1 &&
        ACTIONABLE_ROLES.indexOf(role) === -1;
    }

    function isTabindexOnlyWrapper(el) {
      var tag = el.tagName.toLowerCase();
      if (["div", "span", "li"].indexOf(tag) === -1) return false;
      if (!el.hasAttribute("tabindex")) return false;
      return ariaRole(el) === null && !el.hasAttribute("onclick");
    }

    function isPasswordOrHidden(el) {
      var tag = el.tagName.toLowerCase();
      if (tag !== "input") return false;
      var t = (el.getAttribute("type") || "text").toLowerCase();
      return t === "password" || t === "hidden";
    }

    function accessibleName(el) {
      var tag = el.tagName.toLowerCase();
      if (tag === "select") {
        var opt = el.options[el.selectedIndex];
        var base = el.getAttribute("aria-label") || el.name || "Select";
        return base + (opt ? " (selected: \"" + opt.text.slice(0, 60) + "\")" : "");
      }
      if ((tag === "input") && (el.type === "checkbox" || el.type === "radio")) {
        var labelText = "";
        if (el.id) {
          var lbl = document.querySelector("label[for=\"" + CSS.escape(el.id) + "\"]");
          if (lbl) labelText = lbl.innerText.trim();
        }
        if (!labelText && el.closest("label")) labelText = el.closest("label").innerText.trim();
        return labelText || el.getAttribute("aria-label") || "";
      }
      var direct = el.getAttribute("aria-label") || el.getAttribute("title") ||
        el.getAttribute("placeholder") || el.getAttribute("alt") || el.getAttribute("name");
      if (direct) return direct.slice(0, 120);
      var text = (el.innerText || "").trim();
      if (text) return text.slice(0, 120);
      var img = el.querySelector && el.querySelector("img[alt]");
      if (img) return (img.getAttribute("alt") || "").slice(0, 120);
      return "";
    }

    function context(el) {
      var node = el.parentElement;
      var hops = 0;
      while (node && hops < 5) {
        var label = node.getAttribute && node.getAttribute("aria-label");
        if (label) return label.slice(0, 50);
        var heading = node.matches && node.matches("h1,h2,h3,h4,h5,h6") ?
          node.innerText : null;
        if (heading) return heading.trim().slice(0, 50);
        var tag = node.tagName ? node.tagName.toLowerCase() : "";
        if (["nav", "main", "header", "footer", "aside", "form"].indexOf(tag) !== -1) {
          return tag.slice(0, 50);
        }
        node = node.parentElement;
        hops++;
      }
      return "";
    }

    function isNestedInside(el, parentCandidate) {
      var tag = el.tagName.toLowerCase();
      var role = ariaRole(el);
      return (tag === "a" || tag === "button" || role === "link" || role === "button") &&
        parentCandidate !== el &&
        (parentCandidate.tagName.toLowerCase() === "a" ||
          parentCandidate.tagName.toLowerCase() === "button" ||
          ariaRole(parentCandidate) === "link" || ariaRole(parentCandidate) === "button") &&
        parentCandidate.contains(el);
    }

    var elements = [];
    var seenNodes = [];

    function collectFrom(root) {
      var walker = document.createTreeWalker(root, NodeFilter.SHOW_ELEMENT, null);
      var node = root.firstChild ? walker.nextNode() : null;
      while (node) {
        visit(node);
        if (node.shadowRoot) collectFrom(node.shadowRoot);
        node = walker.nextNode();
      }
    }

    function visit(el) {
      if (!isVisible(el)) return;
      if (!el.getBoundingClientRect) return;
      var rect = el.getBoundingClientRect();
      if (!nearViewport(rect)) return;
      if (isPasswordOrHidden(el)) return;
      if (isTabindexOnlyWrapper(el)) return;
      if (isNoise(el)) return;
      if (!isActionable(el)) return;

      for (var i = seenNodes.length - 1; i >= 0; i--) {
        if (isNestedInside(el, seenNodes[i])) {
          elements.splice(i, 1);
          seenNodes.splice(i, 1);
        }
      }

      var name = accessibleName(el);
      var tag = el.tagName.toLowerCase();
      var isSelect = tag === "select";
      var isInputLike = tag === "input" || tag === "textarea" || el.isContentEditable;
      var isVideoEl = tag === "video";

      if (!name && !isInputLike && !isSelect && !isVideoEl) return;

      var uid;
      var existingUid = el.getAttribute("data-edith-uid");
      if (existingUid) {
        uid = parseInt(existingUid, 10);
      } else {
        uid = nextUid++;
        el.setAttribute("data-edith-uid", String(uid));
      }

      var rawType = el.getAttribute("type");
      var inputType = (typeof rawType === "string") ? rawType.toLowerCase() : null;

      var checked = null;
      if (tag === "input" && (el.type === "checkbox" || el.type === "radio")) {
        checked = !!el.checked;
      }
      var ariaChecked = el.getAttribute("aria-checked");
      if (ariaChecked === "true") checked = true;
      else if (ariaChecked === "false") checked = false;

      var disabled = el.disabled === true || el.getAttribute("aria-disabled") === "true";

      var ariaExpandedAttr = el.getAttribute("aria-expanded");
      var ariaExpanded = ariaExpandedAttr === null ? null : ariaExpandedAttr === "true";

      var options = null;
      if (isSelect) {
        options = [];
        for (var oi = 0; oi < el.options.length && oi < 30; oi++) {
          var o = el.options[oi];
          options.push({ value: o.value, text: (o.text || "").slice(0, 60), selected: o.selected });
        }
      }

      elements.push({
        uid: uid,
        tag: tag,
        role: ariaRole(el) || tag,
        name: name,
        context: context(el),
        href: el.getAttribute && el.getAttribute("href") ? el.href : null,
        type: inputType,
        value: isPasswordOrHidden(el) ? null : (("value" in el) ? el.value : null),
        placeholder: el.getAttribute ? el.getAttribute("placeholder") : null,
        x: rect.x, y: rect.y, width: rect.width, height: rect.height,
        isClickable: isActionable(el) && !isInputLike && !isVideoEl,
        isInput: isInputLike,
        isVideo: isVideoEl,
        isSelect: isSelect,
        disabled: disabled,
        checked: checked,
        ariaExpanded: ariaExpanded,
        options: options
      });

      seenNodes.push(el);
    }

    collectFrom(document.body || document.documentElement);

    return JSON.stringify({
      url: location.href,
      title: document.title,
      elements: elements,
      rawText: (document.body ? document.body.innerText : "").slice(0, 5000)
    });
  } catch (e) {
    return JSON.stringify({
      url: location.href,
      title: document.title,
      elements: [],
      rawText: "Snapshot error: " + (e && e.message ? e.message : String(e))
    });
  }
})()
"#;
