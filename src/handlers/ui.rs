use axum::{
    response::Html,
    routing::get,
    Router,
};

use crate::models::{DEFAULT_DURATION_SECONDS, DEFAULT_PROMPT, MAX_DURATION_SECONDS, MIN_DURATION_SECONDS};

pub fn ui_routes() -> Router {
    Router::new().route("/", get(studio_page))
}

/// Single page studio: prompt form on the left, clip library on the right.
pub async fn studio_page() -> Html<String> {
    let html = STUDIO_HTML
        .replace("{{DEFAULT_PROMPT}}", DEFAULT_PROMPT)
        .replace("{{MIN_DURATION}}", &MIN_DURATION_SECONDS.to_string())
        .replace("{{MAX_DURATION}}", &MAX_DURATION_SECONDS.to_string())
        .replace("{{DEFAULT_DURATION}}", &DEFAULT_DURATION_SECONDS.to_string());
    Html(html)
}

const STUDIO_HTML: &str = r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>🎬 Veo Studio</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            line-height: 1.6;
            color: #e8e8e8;
            background: linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f1419 100%);
            min-height: 100vh;
        }

        .app-container {
            display: grid;
            grid-template-columns: minmax(320px, 1fr) 2fr;
            gap: 24px;
            max-width: 1400px;
            margin: 0 auto;
            padding: 24px;
        }

        .panel {
            background: rgba(255, 255, 255, 0.05);
            border: 1px solid rgba(255, 255, 255, 0.1);
            border-radius: 12px;
            padding: 20px;
        }

        h1 { font-size: 1.6rem; margin-bottom: 12px; }
        h2 { font-size: 1.2rem; margin-bottom: 12px; }
        label { display: block; margin: 12px 0 4px; font-size: 0.9rem; color: #b0b0c0; }

        textarea, input, select {
            width: 100%;
            padding: 10px;
            border-radius: 8px;
            border: 1px solid rgba(255, 255, 255, 0.2);
            background: rgba(0, 0, 0, 0.3);
            color: #e8e8e8;
            font-size: 0.95rem;
        }

        textarea { min-height: 110px; resize: vertical; }

        button {
            padding: 10px 16px;
            border: none;
            border-radius: 8px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled { opacity: 0.5; cursor: wait; }
        button.secondary { background: rgba(255, 255, 255, 0.1); font-weight: 400; }

        .examples { display: flex; flex-wrap: wrap; gap: 6px; margin-top: 8px; }
        .examples button { font-size: 0.8rem; text-align: left; }

        .status { margin-top: 12px; min-height: 1.5em; font-size: 0.9rem; }
        .status.error { color: #ff7b7b; }

        video { width: 100%; border-radius: 8px; margin-top: 12px; background: #000; }

        .library-controls { display: flex; gap: 8px; margin-bottom: 12px; }
        .library-controls input { flex: 2; }
        .library-controls select { flex: 1; }

        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
            gap: 12px;
        }

        .card { background: rgba(0, 0, 0, 0.25); border-radius: 8px; padding: 8px; }
        .card video { margin-top: 0; }
        .card .meta { font-size: 0.8rem; color: #b0b0c0; word-break: break-all; }

        .pager { display: flex; justify-content: center; align-items: center; gap: 12px; margin-top: 16px; }
    </style>
</head>
<body>
    <div class="app-container">
        <div class="panel">
            <h1>🎬 Veo Studio</h1>
            <label for="prompt">Prompt</label>
            <textarea id="prompt">{{DEFAULT_PROMPT}}</textarea>
            <div class="examples" id="examples"></div>

            <label for="duration">Duration (seconds)</label>
            <input id="duration" type="number" min="{{MIN_DURATION}}" max="{{MAX_DURATION}}" value="{{DEFAULT_DURATION}}">

            <label for="aspect">Aspect ratio</label>
            <select id="aspect">
                <option value="16:9">16:9 landscape</option>
                <option value="1:1">1:1 square</option>
                <option value="9:16">9:16 portrait</option>
            </select>

            <div style="margin-top: 16px;">
                <button id="generate">Generate video</button>
            </div>
            <div class="status" id="status"></div>
            <video id="result" controls style="display: none;"></video>
        </div>

        <div class="panel">
            <h2>📚 Library</h2>
            <div class="library-controls">
                <input id="search" placeholder="Search videos">
                <select id="sort">
                    <option value="newest">Newest first</option>
                    <option value="oldest">Oldest first</option>
                </select>
                <button class="secondary" id="refresh">Refresh</button>
            </div>
            <div class="grid" id="library"></div>
            <div class="pager">
                <button class="secondary" id="prev">◀ Prev</button>
                <span id="page-label">Page 1 of 1</span>
                <button class="secondary" id="next">Next ▶</button>
            </div>
        </div>
    </div>

    <script>
        function newSessionId() {
            return 'xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx'.replace(/[xy]/g, function(c) {
                const r = Math.random() * 16 | 0;
                const v = c === 'x' ? r : (r & 0x3 | 0x8);
                return v.toString(16);
            });
        }

        const sessionId = localStorage.getItem('veoSessionId') || newSessionId();
        localStorage.setItem('veoSessionId', sessionId);

        let currentPage = 1;
        let totalPages = 1;

        const $ = (id) => document.getElementById(id);

        function setStatus(message, isError) {
            const status = $('status');
            status.textContent = message;
            status.className = isError ? 'status error' : 'status';
        }

        async function loadExamples() {
            const response = await fetch('/api/examples');
            const data = await response.json();
            const container = $('examples');
            container.innerHTML = '';
            data.examples.forEach((example) => {
                const button = document.createElement('button');
                button.className = 'secondary';
                button.textContent = example;
                button.onclick = () => {
                    $('prompt').value = example;
                    fetch(`/api/sessions/${sessionId}/prompt`, {
                        method: 'PUT',
                        headers: { 'Content-Type': 'application/json' },
                        body: JSON.stringify({ prompt: example })
                    });
                };
                container.appendChild(button);
            });
        }

        async function loadSession() {
            const response = await fetch(`/api/sessions/${sessionId}`);
            if (!response.ok) return;
            const session = await response.json();
            $('prompt').value = session.prompt;
            currentPage = session.page;
            if (session.last_result) {
                showResult();
            }
        }

        function showResult() {
            const video = $('result');
            video.src = `/api/sessions/${sessionId}/video?t=${Date.now()}`;
            video.style.display = 'block';
        }

        async function generate() {
            const button = $('generate');
            button.disabled = true;
            setStatus('⏳ Generating... this can take a few minutes.', false);
            try {
                const response = await fetch(`/api/sessions/${sessionId}/generate`, {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({
                        prompt: $('prompt').value,
                        duration_seconds: parseInt($('duration').value, 10),
                        aspect_ratio: $('aspect').value
                    })
                });
                const data = await response.json();
                if (!response.ok) {
                    setStatus(`❌ ${data.message}`, true);
                    return;
                }
                setStatus(`✅ Saved to ${data.result.video.uri}`, false);
                showResult();
                loadLibrary(1);
            } catch (e) {
                setStatus(`❌ ${e}`, true);
            } finally {
                button.disabled = false;
            }
        }

        async function loadLibrary(page) {
            const params = new URLSearchParams({
                query: $('search').value,
                sort: $('sort').value,
                session_id: sessionId
            });
            if (page) params.set('page', page);

            const response = await fetch(`/api/videos?${params}`);
            const data = await response.json();
            const grid = $('library');
            grid.innerHTML = '';

            if (!response.ok) {
                grid.textContent = `❌ ${data.message}`;
                return;
            }

            currentPage = data.page;
            totalPages = data.total_pages;
            $('page-label').textContent = `Page ${currentPage} of ${totalPages} (${data.total} videos)`;

            if (data.videos.length === 0) {
                grid.textContent = 'No videos found.';
            }

            data.videos.forEach((video) => {
                const card = document.createElement('div');
                card.className = 'card';
                const player = document.createElement('video');
                player.controls = true;
                player.preload = 'none';
                player.src = `/api/videos/file?uri=${encodeURIComponent(video.uri)}`;
                const meta = document.createElement('div');
                meta.className = 'meta';
                meta.textContent = `${video.file_name} · ${new Date(video.created_at).toLocaleString()}`;
                card.appendChild(player);
                card.appendChild(meta);
                grid.appendChild(card);
            });
        }

        $('generate').onclick = generate;
        $('refresh').onclick = () => loadLibrary(currentPage);
        $('search').oninput = () => loadLibrary(1);
        $('sort').onchange = () => loadLibrary(1);
        $('prev').onclick = () => loadLibrary(Math.max(1, currentPage - 1));
        $('next').onclick = () => loadLibrary(Math.min(totalPages, currentPage + 1));

        loadExamples();
        loadSession().then(() => loadLibrary(currentPage));
    </script>
</body>
</html>
"###;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_studio_page_fills_defaults() {
        let Html(page) = studio_page().await;
        assert!(page.contains(DEFAULT_PROMPT));
        assert!(page.contains("max=\"8\""));
        assert!(!page.contains("{{"));
        assert!(page.contains("/api/videos"));
    }
}
