use crate::models::TaskType;
use crate::palette::type_styles;
use crate::popup::escape_html;
use crate::view::ViewMode;

pub fn render_index(assignees: &[String], task_types: &[TaskType]) -> String {
    let assignee_options: String = assignees
        .iter()
        .map(|name| {
            let name = escape_html(name);
            format!(r#"<option value="{name}">{name}</option>"#)
        })
        .collect();

    let type_items: String = task_types
        .iter()
        .map(|task_type| {
            let name = escape_html(&task_type.name);
            format!(
                r#"<li><label><input type="checkbox" class="type-cb" checked value="{name}" onchange="redrawChart()" /> {name}</label></li>"#
            )
        })
        .collect();

    let view_buttons: String = ViewMode::ALL
        .iter()
        .map(|mode| {
            let label = mode.label();
            let active = if *mode == ViewMode::default() { " active" } else { "" };
            format!(r#"<button class="button view-btn{active}" onclick="changeView('{label}', this)">{label}</button>"#)
        })
        .collect();

    INDEX_HTML
        .replace("{{TYPE_STYLES}}", &type_styles(task_types))
        .replace("{{ASSIGNEE_OPTIONS}}", &assignee_options)
        .replace("{{TYPE_ITEMS}}", &type_items)
        .replace("{{VIEW_BUTTONS}}", &view_buttons)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Gantt Board</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/frappe-gantt@0.6.1/dist/frappe-gantt.css" />
  <script src="https://cdn.jsdelivr.net/npm/frappe-gantt@0.6.1/dist/frappe-gantt.min.js"></script>
  <style>
    body { font-family: "Trebuchet MS", sans-serif; margin: 0; padding: 18px; background: #f6f7f9; color: #2b2a28; }
    .toolbar { display: flex; flex-wrap: wrap; gap: 8px; align-items: center; margin-bottom: 12px; }
    .button { border: 1px solid #ccd; background: #fff; border-radius: 6px; padding: 6px 10px; cursor: pointer; }
    .button.active { background: #2f4858; color: #fff; }
    .hidden { display: none; }
    #type-filter-wrapper { position: relative; }
    #type-filter-items { display: none; position: absolute; background: #fff; list-style: none; padding: 8px; margin: 0; border: 1px solid #ccd; z-index: 5; }
    #type-filter-wrapper.visible #type-filter-items { display: block; }
    .modal { display: none; position: fixed; inset: 0; background: rgba(0, 0, 0, 0.4); align-items: center; justify-content: center; }
    .modal > div { background: #fff; padding: 18px; border-radius: 10px; display: grid; gap: 6px; min-width: 260px; }
    .details-container { padding: 10px; display: grid; gap: 4px; min-width: 220px; }
    .details-container h5 { margin: 0; }
    .task-dates { margin: 0 0 5px 0; font-size: 11px; color: #999; }
    .task-link { float: right; font-size: 11px; }
  </style>
  <style id="dynamic-styles">{{TYPE_STYLES}}</style>
</head>
<body>
  <div class="toolbar">
    {{VIEW_BUTTONS}}
    <select id="assignee-filter" onchange="redrawChart()">
      <option value="All">All Developers</option>
      {{ASSIGNEE_OPTIONS}}
    </select>
    <div id="type-filter-wrapper">
      <button class="button" onclick="toggleTypeFilter()">Task Types</button>
      <ul id="type-filter-items">
        <li><label><input type="checkbox" id="cb-all-types" checked onchange="toggleAllTypes(this)" /> All</label></li>
        {{TYPE_ITEMS}}
      </ul>
    </div>
    <button id="auth-btn" class="button" onclick="toggleEditMode()">Unlock Editing</button>
    <button id="add-btn" class="button hidden" onclick="openAddModal()">Add Task</button>
  </div>
  <div id="gantt"></div>

  <div id="password-modal" class="modal"><div>
    <label>Password</label>
    <input id="admin-pass" type="password" />
    <button class="button" onclick="verifyPassword()">Unlock</button>
    <button class="button" onclick="closeModal('password-modal')">Cancel</button>
  </div></div>

  <div id="add-modal" class="modal"><div>
    <input id="new-id" placeholder="ID (optional)" />
    <input id="new-name" placeholder="Name" />
    <input id="new-start" type="date" />
    <input id="new-end" type="date" />
    <select id="new-type"></select>
    <select id="new-assignee"></select>
    <input id="new-progress" type="number" min="0" max="100" value="0" />
    <input id="new-url" placeholder="https://..." />
    <textarea id="new-desc" placeholder="Description"></textarea>
    <button class="button" onclick="saveNewTask()">Save</button>
    <button class="button" onclick="closeModal('add-modal')">Cancel</button>
  </div></div>

  <script>
    const board = { token: null, mode: 'Week', gantt: null, chart: null };

    function authHeaders() {
      const headers = { 'Content-Type': 'application/json' };
      if (board.token) headers['Authorization'] = 'Bearer ' + board.token;
      return headers;
    }

    function chartQuery() {
      const params = new URLSearchParams();
      params.set('assignee', document.getElementById('assignee-filter').value);
      const types = Array.from(document.querySelectorAll('.type-cb:checked')).map(cb => encodeURIComponent(cb.value));
      params.set('types', types.join(','));
      params.set('mode', board.mode);
      return params.toString();
    }

    function renderChart(chart) {
      document.getElementById('cb-all-types').checked = chart.all_types_checked;
      document.getElementById('dynamic-styles').innerHTML = chart.styles;
      document.getElementById('gantt').innerHTML = '';
      if (chart.tasks.length === 0) return;
      board.gantt = new Gantt('#gantt', chart.tasks, {
        view_mode: chart.view_mode, date_format: 'YYYY-MM-DD', readonly: chart.readonly,
        bar_height: 25, bar_corner_radius: 3, arrow_curve: 5, padding: 18,
        custom_popup_html: task => task.popup_html,
        on_date_change: (task, start, end) => {
          if (chart.readonly) return;
          const patch = { id: task._originalId, start: start.toISOString().split('T')[0], end: end.toISOString().split('T')[0] };
          patchLocal(patch);
          sendUpdate(patch);
        },
        on_progress_change: (task, progress) => {
          if (chart.readonly) return;
          const patch = { id: task._originalId, progress: Math.round(progress) };
          patchLocal(patch);
          sendUpdate(patch);
        }
      });
    }

    async function redrawChart() {
      try {
        const res = await fetch('/api/chart?' + chartQuery(), { headers: authHeaders() });
        board.chart = await res.json();
        renderChart(board.chart);
      } catch (err) {
        console.error(err);
      }
    }

    // Mirrors an edit into the last chart so the page shows it before the server answers.
    function patchLocal(patch) {
      if (!board.chart) return;
      const bar = board.chart.tasks.find(t => String(t._originalId) === String(patch.id));
      if (!bar) return;
      for (const key of ['name', 'start', 'end', 'progress']) {
        if (key in patch) bar[key] = patch[key];
      }
    }

    async function sendUpdate(patch) {
      try {
        const res = await fetch('/api/update-task', { method: 'POST', headers: authHeaders(), body: JSON.stringify(patch) });
        if (!res.ok) console.error('update rejected', res.status, patch);
        return res.ok;
      } catch (err) {
        console.error(err);
        return false;
      }
    }

    window.updateGeneric = async function (id, field, value) {
      const patch = { id: id, [field]: value };
      patchLocal(patch);
      if (board.chart) renderChart(board.chart);
      if (await sendUpdate(patch)) redrawChart();
    };

    window.updateDependencies = function (id, select) {
      const values = Array.from(select.selectedOptions).map(opt => opt.value).filter(v => v !== '');
      updateGeneric(id, 'dependencies', values.join(', '));
    };

    function toggleAllTypes(source) {
      document.querySelectorAll('.type-cb').forEach(cb => { cb.checked = source.checked; });
      redrawChart();
    }

    function toggleTypeFilter() {
      document.getElementById('type-filter-wrapper').classList.toggle('visible');
    }

    function changeView(mode, btn) {
      document.querySelectorAll('.view-btn').forEach(b => b.classList.remove('active'));
      btn.classList.add('active');
      board.mode = mode;
      if (board.gantt) board.gantt.change_view_mode(mode);
    }

    function closeModal(id) { document.getElementById(id).style.display = 'none'; }

    function updateAuthUI() {
      const unlocked = board.token !== null;
      document.getElementById('auth-btn').textContent = unlocked ? 'Lock Editing' : 'Unlock Editing';
      document.getElementById('add-btn').classList.toggle('hidden', !unlocked);
    }

    async function toggleEditMode() {
      if (board.token) {
        await fetch('/api/logout', { method: 'POST', headers: authHeaders() }).catch(console.error);
        board.token = null;
        updateAuthUI();
        redrawChart();
        return;
      }
      document.getElementById('admin-pass').value = '';
      document.getElementById('password-modal').style.display = 'flex';
    }

    async function verifyPassword() {
      const password = document.getElementById('admin-pass').value;
      const res = await fetch('/api/login', { method: 'POST', headers: authHeaders(), body: JSON.stringify({ password }) });
      const data = await res.json();
      if (!data.success) return alert('Incorrect Password');
      board.token = data.token;
      closeModal('password-modal');
      updateAuthUI();
      redrawChart();
    }

    async function openAddModal() {
      const [types, devs] = await Promise.all([
        fetch('/api/task-types').then(r => r.json()),
        fetch('/api/assignees').then(r => r.json())
      ]);
      const fill = (id, values) => {
        const select = document.getElementById(id);
        select.innerHTML = '';
        values.forEach(v => select.add(new Option(v, v)));
      };
      fill('new-type', types.map(t => t.name));
      fill('new-assignee', devs);
      document.getElementById('add-modal').style.display = 'flex';
    }

    async function saveNewTask() {
      const value = id => document.getElementById(id).value;
      if (!value('new-name') || !value('new-start') || !value('new-end')) {
        return alert('Missing Mandatory Fields (Name, Start, End)');
      }
      const payload = {
        id: value('new-id'), name: value('new-name'), start: value('new-start'), end: value('new-end'),
        task_type: value('new-type'), assignee: value('new-assignee'), progress: Number(value('new-progress')),
        task_url: value('new-url'), desc: value('new-desc')
      };
      const res = await fetch('/api/add-task', { method: 'POST', headers: authHeaders(), body: JSON.stringify(payload) });
      const data = await res.json();
      if (data.error) return alert(data.error);
      closeModal('add-modal');
      document.getElementById('new-name').value = '';
      document.getElementById('new-id').value = '';
      redrawChart();
    }

    document.addEventListener('click', event => {
      const wrapper = document.getElementById('type-filter-wrapper');
      if (!wrapper.contains(event.target)) wrapper.classList.remove('visible');
    });

    window.onload = redrawChart;
  </script>
</body>
</html>
"#;
