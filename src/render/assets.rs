//! Static assets embedded into every rendered page.
//!
//! The published documents must work from a plain file mount with no
//! server behind them, so the stylesheet and the sort/group behaviour are
//! inlined rather than referenced.

/// Page stylesheet.
pub const PAGE_CSS: &str = r#"
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 2rem; color: #1c1c1c; }
h1 { font-size: 1.5rem; }
a { color: #0b62a4; }
.banner { background: #f4f6f8; border: 1px solid #d7dde3; border-radius: 4px; padding: 0.75rem 1rem; margin-bottom: 1.5rem; }
.banner .counts { margin: 0; }
.banner details { margin-top: 0.5rem; }
.banner li { font-size: 0.85rem; }
.table-controls { margin: 0.5rem 0; font-size: 0.9rem; }
table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
th, td { border: 1px solid #d7dde3; padding: 0.35rem 0.5rem; text-align: left; vertical-align: top; }
th[data-key] { cursor: pointer; user-select: none; }
th[data-key]:hover { background: #eef2f5; }
thead th { background: #f4f6f8; position: sticky; top: 0; }
.mono { font-family: ui-monospace, 'SF Mono', Consolas, monospace; white-space: nowrap; }
.tag { display: inline-block; background: #e3ecf3; border-radius: 3px; padding: 0 0.3rem; margin-right: 0.2rem; }
.flag { display: inline-block; background: #fbe9e7; border-radius: 3px; padding: 0 0.3rem; margin-right: 0.2rem; }
tbody.entry tr.parent { cursor: pointer; }
tbody.entry tr.parent:hover { background: #f8fafb; }
tbody.entry tr.detail { display: none; }
tbody.entry.open tr.detail { display: table-row; }
tbody.entry tr.detail td { background: #fbfcfd; color: #444; }
tbody.group-head td { background: #e7edf2; font-weight: 600; }
"#;

/// Client-side column sorting, grouping, and detail-row toggling for the
/// findings table.
///
/// Grouping is a partition over the rows in their current display order:
/// rows are bucketed by the selected key, buckets keep first-appearance
/// order, and rows inside a bucket keep the underlying sort order.
pub const TABLE_JS: &str = r#"
(function () {
  var table = document.querySelector('table.findings');
  if (!table) { return; }

  var state = { key: null, dir: 1, group: 'none' };

  function entryRows() {
    return Array.from(table.querySelectorAll('tbody.entry'));
  }

  function compare(a, b, key, dir) {
    var av = a.dataset[key] || '';
    var bv = b.dataset[key] || '';
    if (key === 'freq') {
      av = av === '' ? Infinity : parseFloat(av);
      bv = bv === '' ? Infinity : parseFloat(bv);
      return dir * (av === bv ? 0 : av < bv ? -1 : 1);
    }
    return dir * av.localeCompare(bv);
  }

  function apply() {
    table.querySelectorAll('tbody.group-head').forEach(function (g) { g.remove(); });

    var rows = entryRows();
    if (state.key) {
      rows.sort(function (a, b) { return compare(a, b, state.key, state.dir); });
    }
    rows.forEach(function (r) { table.appendChild(r); });

    if (state.group === 'none') { return; }

    var cols = table.querySelectorAll('thead th').length;
    var buckets = new Map();
    entryRows().forEach(function (r) {
      var k = r.dataset[state.group] || '';
      if (!buckets.has(k)) { buckets.set(k, []); }
      buckets.get(k).push(r);
    });

    buckets.forEach(function (members, k) {
      var head = document.createElement('tbody');
      head.className = 'group-head';
      var tr = document.createElement('tr');
      var td = document.createElement('td');
      td.colSpan = cols;
      td.textContent = k + ' (' + members.length + ')';
      tr.appendChild(td);
      head.appendChild(tr);
      table.appendChild(head);
      members.forEach(function (m) { table.appendChild(m); });
    });
  }

  table.querySelectorAll('th[data-key]').forEach(function (th) {
    th.addEventListener('click', function () {
      var key = th.dataset.key;
      state.dir = state.key === key ? -state.dir : 1;
      state.key = key;
      apply();
    });
  });

  var select = document.querySelector('select.group-select');
  if (select) {
    select.addEventListener('change', function () {
      state.group = select.value;
      apply();
    });
  }

  table.addEventListener('click', function (ev) {
    var parent = ev.target.closest('tr.parent');
    if (parent && !ev.target.closest('a')) {
      parent.parentNode.classList.toggle('open');
    }
  });
})();
"#;
